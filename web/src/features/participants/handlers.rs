use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use storage::dto::participant::ParticipantProfile;
use uuid::Uuid;

use crate::error::WebError;
use crate::state::AppState;

use super::services;

#[utoipa::path(
    get,
    path = "/api/participants/{id}",
    params(("id" = Uuid, Path, description = "Participant id")),
    responses(
        (status = 200, description = "Participant profile with per-sport ratings", body = ParticipantProfile),
        (status = 404, description = "Unknown participant")
    ),
    tag = "participants"
)]
pub async fn get_participant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, WebError> {
    let profile = services::get_profile(&state, id).await?;
    Ok(Json(profile).into_response())
}
