use axum::{
    Router,
    routing::{delete, post},
};

use crate::state::AppState;

use super::handlers::{adjust_rating, ban_participant, revert_match, unban_participant};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/adjustments", post(adjust_rating))
        .route("/matches/:id", delete(revert_match))
        .route("/participants/:id/ban", post(ban_participant))
        .route("/participants/:id/unban", post(unban_participant))
}
