use std::str::FromStr;

use storage::dto::matches::SubmitMatchRequest;
use storage::error::Result;
use storage::models::{Match, Sport};
use uuid::Uuid;

use crate::state::AppState;

pub async fn submit(state: &AppState, submitter: Uuid, req: &SubmitMatchRequest) -> Result<Match> {
    let sport = Sport::from_str(&req.sport)?;
    state
        .matches
        .submit(
            sport,
            submitter,
            req.opponent_id,
            req.own_score,
            req.opponent_score,
        )
        .await
}

pub async fn confirm(state: &AppState, match_id: Uuid, actor: Uuid) -> Result<Match> {
    state.matches.confirm(match_id, actor).await
}

pub async fn deny(state: &AppState, match_id: Uuid, actor: Uuid) -> Result<Match> {
    state.matches.deny(match_id, actor).await
}

pub async fn cancel(state: &AppState, match_id: Uuid, actor: Uuid) -> Result<Match> {
    state.matches.cancel(match_id, actor).await
}

pub async fn list_for(
    state: &AppState,
    participant: Uuid,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Match>, i64)> {
    state.matches.list_for(participant, limit, offset).await
}
