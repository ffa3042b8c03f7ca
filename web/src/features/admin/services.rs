use std::str::FromStr;

use storage::dto::admin::AdjustRatingRequest;
use storage::error::Result;
use storage::models::{Actor, Match, Participant, RatingAdjustment, Sport};
use uuid::Uuid;

use crate::state::AppState;

pub async fn adjust_rating(
    state: &AppState,
    actor: Actor,
    req: &AdjustRatingRequest,
) -> Result<RatingAdjustment> {
    let sport = Sport::from_str(&req.sport)?;
    state
        .admin
        .adjust_rating(
            actor,
            req.participant_id,
            sport,
            req.new_rating,
            req.reason.clone(),
        )
        .await
}

pub async fn revert_match(state: &AppState, actor: Actor, match_id: Uuid) -> Result<Match> {
    state.admin.revert_match(actor, match_id).await
}

pub async fn ban(
    state: &AppState,
    actor: Actor,
    participant_id: Uuid,
    reason: String,
) -> Result<Participant> {
    state.admin.ban(actor, participant_id, reason).await
}

pub async fn unban(state: &AppState, actor: Actor, participant_id: Uuid) -> Result<Participant> {
    state.admin.unban(actor, participant_id).await
}
