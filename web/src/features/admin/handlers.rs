use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use storage::dto::admin::{AdjustRatingRequest, BanRequest};
use storage::dto::participant::ParticipantProfile;
use storage::models::{Match, RatingAdjustment};
use uuid::Uuid;
use validator::Validate;

use crate::error::WebError;
use crate::middleware::identity::Identity;
use crate::state::AppState;

use super::services;

#[utoipa::path(
    post,
    path = "/api/admin/adjustments",
    request_body = AdjustRatingRequest,
    responses(
        (status = 201, description = "Rating overwritten and audited", body = RatingAdjustment),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "Unknown participant")
    ),
    tag = "admin"
)]
pub async fn adjust_rating(
    State(state): State<AppState>,
    identity: Identity,
    Json(req): Json<AdjustRatingRequest>,
) -> Result<Response, WebError> {
    req.validate()?;
    let adjustment = services::adjust_rating(&state, identity.actor(), &req).await?;
    Ok((StatusCode::CREATED, Json(adjustment)).into_response())
}

#[utoipa::path(
    delete,
    path = "/api/admin/matches/{id}",
    params(("id" = Uuid, Path, description = "Match id")),
    responses(
        (status = 200, description = "Match reverted, ratings restored", body = Match),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "Unknown or already reverted match"),
        (status = 409, description = "Match is not confirmed")
    ),
    tag = "admin"
)]
pub async fn revert_match(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Response, WebError> {
    let reverted = services::revert_match(&state, identity.actor(), id).await?;
    Ok(Json(reverted).into_response())
}

#[utoipa::path(
    post,
    path = "/api/admin/participants/{id}/ban",
    params(("id" = Uuid, Path, description = "Participant id")),
    request_body = BanRequest,
    responses(
        (status = 200, description = "Participant suspended", body = ParticipantProfile),
        (status = 403, description = "Not permitted (non-admin, self-ban or target is an admin)"),
        (status = 404, description = "Unknown participant")
    ),
    tag = "admin"
)]
pub async fn ban_participant(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(req): Json<BanRequest>,
) -> Result<Response, WebError> {
    req.validate()?;
    let banned = services::ban(&state, identity.actor(), id, req.reason).await?;
    Ok(Json(ParticipantProfile::from(banned)).into_response())
}

#[utoipa::path(
    post,
    path = "/api/admin/participants/{id}/unban",
    params(("id" = Uuid, Path, description = "Participant id")),
    responses(
        (status = 200, description = "Suspension lifted", body = ParticipantProfile),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "Unknown participant")
    ),
    tag = "admin"
)]
pub async fn unban_participant(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Response, WebError> {
    let unbanned = services::unban(&state, identity.actor(), id).await?;
    Ok(Json(ParticipantProfile::from(unbanned)).into_response())
}
