use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Sport;

/// Raw per-participant aggregate as recomputed from the store: current
/// rating joined with confirmed win/loss counts for one sport.
#[derive(Debug, Clone, FromRow)]
pub struct LeaderboardRow {
    pub participant_id: Uuid,
    pub display_name: String,
    pub rating: i32,
    pub wins: i64,
    pub losses: i64,
}

/// One ranked leaderboard line as served to readers.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub participant_id: Uuid,
    pub display_name: String,
    pub rating: i32,
    pub wins: i64,
    pub losses: i64,
    pub win_rate: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardResponse {
    pub sport: Sport,
    pub entries: Vec<LeaderboardEntry>,
}
