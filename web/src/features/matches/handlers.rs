use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use storage::dto::{
    common::{PaginatedResponse, PaginationParams},
    matches::SubmitMatchRequest,
};
use storage::models::Match;
use uuid::Uuid;
use validator::Validate;

use crate::error::WebError;
use crate::middleware::identity::Identity;
use crate::state::AppState;

use super::services;

#[utoipa::path(
    post,
    path = "/api/matches",
    request_body = SubmitMatchRequest,
    responses(
        (status = 201, description = "Match submitted, awaiting the opponent's confirmation", body = Match),
        (status = 400, description = "Invalid submission"),
        (status = 404, description = "Unknown opponent"),
        (status = 409, description = "A pending match already exists for this pair and sport")
    ),
    tag = "matches"
)]
pub async fn submit_match(
    State(state): State<AppState>,
    identity: Identity,
    Json(req): Json<SubmitMatchRequest>,
) -> Result<Response, WebError> {
    req.validate()?;
    let m = services::submit(&state, identity.participant_id, &req).await?;
    Ok((StatusCode::CREATED, Json(m)).into_response())
}

#[utoipa::path(
    post,
    path = "/api/matches/{id}/confirm",
    params(("id" = Uuid, Path, description = "Match id")),
    responses(
        (status = 200, description = "Match confirmed, ratings updated", body = Match),
        (status = 403, description = "Caller may not confirm this match"),
        (status = 404, description = "Unknown match"),
        (status = 409, description = "Match is no longer pending")
    ),
    tag = "matches"
)]
pub async fn confirm_match(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Response, WebError> {
    let m = services::confirm(&state, id, identity.participant_id).await?;
    Ok(Json(m).into_response())
}

#[utoipa::path(
    post,
    path = "/api/matches/{id}/deny",
    params(("id" = Uuid, Path, description = "Match id")),
    responses(
        (status = 200, description = "Match denied, no rating change", body = Match),
        (status = 403, description = "Caller may not deny this match"),
        (status = 404, description = "Unknown match"),
        (status = 409, description = "Match is no longer pending")
    ),
    tag = "matches"
)]
pub async fn deny_match(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Response, WebError> {
    let m = services::deny(&state, id, identity.participant_id).await?;
    Ok(Json(m).into_response())
}

#[utoipa::path(
    post,
    path = "/api/matches/{id}/cancel",
    params(("id" = Uuid, Path, description = "Match id")),
    responses(
        (status = 200, description = "Submission withdrawn", body = Match),
        (status = 403, description = "Only the submitter may cancel"),
        (status = 404, description = "Unknown match"),
        (status = 409, description = "Match is no longer pending")
    ),
    tag = "matches"
)]
pub async fn cancel_match(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Response, WebError> {
    let m = services::cancel(&state, id, identity.participant_id).await?;
    Ok(Json(m).into_response())
}

#[utoipa::path(
    get,
    path = "/api/matches",
    params(PaginationParams),
    responses(
        (status = 200, description = "Caller's matches, newest first", body = PaginatedResponse<Match>)
    ),
    tag = "matches"
)]
pub async fn list_matches(
    State(state): State<AppState>,
    identity: Identity,
    Query(pagination): Query<PaginationParams>,
) -> Result<Response, WebError> {
    pagination.validate().map_err(WebError::BadRequest)?;

    let (matches, total_items) = services::list_for(
        &state,
        identity.participant_id,
        pagination.limit() as i64,
        pagination.offset() as i64,
    )
    .await?;

    let response = PaginatedResponse::new(matches, pagination, total_items);
    Ok(Json(response).into_response())
}
