use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::Sport;

/// Append-only record of a manual rating override.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RatingAdjustment {
    pub adjustment_id: Uuid,
    pub participant_id: Uuid,
    pub sport: Sport,
    pub old_rating: i32,
    pub new_rating: i32,
    pub reason: String,
    pub admin_id: Uuid,
    pub created_at: chrono::NaiveDateTime,
}
