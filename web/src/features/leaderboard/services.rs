use storage::dto::leaderboard::LeaderboardResponse;
use storage::error::Result;
use storage::models::Sport;

use crate::state::AppState;

pub async fn get_leaderboard(state: &AppState, sport: Sport) -> Result<LeaderboardResponse> {
    let entries = state.leaderboard.get(sport).await?;
    Ok(LeaderboardResponse {
        sport,
        entries: entries.as_ref().clone(),
    })
}
