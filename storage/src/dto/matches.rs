use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Body of a match submission. The sport arrives as text so an unknown value
/// surfaces as a validation error instead of a deserialization failure.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SubmitMatchRequest {
    pub sport: String,
    pub opponent_id: Uuid,
    #[validate(range(min = 0, message = "scores must be non-negative"))]
    pub own_score: i32,
    #[validate(range(min = 0, message = "scores must be non-negative"))]
    pub opponent_score: i32,
}
