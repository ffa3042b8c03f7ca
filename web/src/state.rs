use std::sync::Arc;

use storage::cache::LeaderboardCache;
use storage::services::admin::AdminService;
use storage::services::leaderboard::LeaderboardService;
use storage::services::lifecycle::MatchService;
use storage::services::rating::RatingSettings;
use storage::store::MatchStore;

#[derive(Clone)]
pub struct AppState {
    pub matches: MatchService,
    pub admin: AdminService,
    pub leaderboard: LeaderboardService,
    pub store: Arc<dyn MatchStore>,
    pub cache: Arc<LeaderboardCache>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn MatchStore>,
        cache: Arc<LeaderboardCache>,
        settings: RatingSettings,
    ) -> Self {
        Self {
            matches: MatchService::new(store.clone(), cache.clone(), settings),
            admin: AdminService::new(store.clone(), cache.clone()),
            leaderboard: LeaderboardService::new(store.clone(), cache.clone()),
            store,
            cache,
        }
    }
}
