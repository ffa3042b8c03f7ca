use axum::{Router, routing::get};

use crate::state::AppState;

use super::handlers::get_participant;

pub fn routes() -> Router<AppState> {
    Router::new().route("/:id", get(get_participant))
}
