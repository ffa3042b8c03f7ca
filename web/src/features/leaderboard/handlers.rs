use std::str::FromStr;

use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use storage::dto::leaderboard::LeaderboardResponse;
use storage::models::Sport;

use crate::error::WebError;
use crate::state::AppState;

use super::services;

#[utoipa::path(
    get,
    path = "/api/leaderboard/{sport}",
    params(("sport" = String, Path, description = "Sport identifier, e.g. table_tennis")),
    responses(
        (status = 200, description = "Ranked leaderboard for the sport", body = LeaderboardResponse),
        (status = 400, description = "Unknown sport")
    ),
    tag = "leaderboard"
)]
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Path(sport): Path<String>,
) -> Result<Response, WebError> {
    let sport = Sport::from_str(&sport)?;
    let response = services::get_leaderboard(&state, sport).await?;
    Ok(Json(response).into_response())
}
