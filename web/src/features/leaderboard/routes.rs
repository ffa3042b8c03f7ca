use axum::{Router, routing::get};

use crate::state::AppState;

use super::handlers::get_leaderboard;

pub fn routes() -> Router<AppState> {
    Router::new().route("/:sport", get(get_leaderboard))
}
