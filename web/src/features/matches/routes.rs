use axum::{Router, routing::post};

use crate::state::AppState;

use super::handlers::{cancel_match, confirm_match, deny_match, list_matches, submit_match};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(submit_match).get(list_matches))
        .route("/:id/confirm", post(confirm_match))
        .route("/:id/deny", post(deny_match))
        .route("/:id/cancel", post(cancel_match))
}
