use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdjustRatingRequest {
    pub participant_id: Uuid,
    pub sport: String,
    #[validate(range(min = 0, max = 10000, message = "rating out of range"))]
    pub new_rating: i32,
    #[validate(length(min = 1, max = 500, message = "a reason is required"))]
    pub reason: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BanRequest {
    #[validate(length(min = 1, max = 500, message = "a reason is required"))]
    pub reason: String,
}
