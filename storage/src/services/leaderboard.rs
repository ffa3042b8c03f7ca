//! Read side of the rankings: cache first, recompute from the store on a
//! miss. The recomputation is a sort plus win/loss aggregation.

use std::sync::Arc;

use crate::cache::LeaderboardCache;
use crate::dto::leaderboard::{LeaderboardEntry, LeaderboardRow};
use crate::error::Result;
use crate::models::Sport;
use crate::store::MatchStore;

#[derive(Clone)]
pub struct LeaderboardService {
    store: Arc<dyn MatchStore>,
    cache: Arc<LeaderboardCache>,
}

impl LeaderboardService {
    pub fn new(store: Arc<dyn MatchStore>, cache: Arc<LeaderboardCache>) -> Self {
        Self { store, cache }
    }

    pub async fn get(&self, sport: Sport) -> Result<Arc<Vec<LeaderboardEntry>>> {
        if let Some(hit) = self.cache.get(sport).await {
            return Ok(hit);
        }

        let rows = self.store.leaderboard(sport).await?;
        let entries = rank(rows);
        tracing::debug!(%sport, entries = entries.len(), "leaderboard recomputed");
        Ok(self.cache.put(sport, entries).await)
    }
}

/// Sorts by rating (ties broken by name for a stable listing) and assigns
/// 1-based ranks.
fn rank(mut rows: Vec<LeaderboardRow>) -> Vec<LeaderboardEntry> {
    rows.sort_by(|a, b| {
        b.rating
            .cmp(&a.rating)
            .then_with(|| a.display_name.cmp(&b.display_name))
    });
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| {
            let played = row.wins + row.losses;
            let win_rate = if played > 0 {
                row.wins as f64 / played as f64
            } else {
                0.0
            };
            LeaderboardEntry {
                rank: i as i64 + 1,
                participant_id: row.participant_id,
                display_name: row.display_name,
                rating: row.rating,
                wins: row.wins,
                losses: row.losses,
                win_rate,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::models::Participant;
    use crate::services::lifecycle::MatchService;
    use crate::services::rating::RatingSettings;
    use crate::store::memory::MemoryStore;

    fn participant(name: &str) -> Participant {
        Participant {
            participant_id: Uuid::new_v4(),
            display_name: name.to_string(),
            campus: None,
            is_admin: false,
            suspended: false,
            suspended_reason: None,
            created_at: Utc::now().naive_utc(),
            ratings: HashMap::new(),
        }
    }

    #[test]
    fn rank_orders_by_rating_and_computes_win_rate() {
        let rows = vec![
            LeaderboardRow {
                participant_id: Uuid::new_v4(),
                display_name: "bob".to_string(),
                rating: 984,
                wins: 0,
                losses: 1,
            },
            LeaderboardRow {
                participant_id: Uuid::new_v4(),
                display_name: "alice".to_string(),
                rating: 1016,
                wins: 1,
                losses: 0,
            },
            LeaderboardRow {
                participant_id: Uuid::new_v4(),
                display_name: "carol".to_string(),
                rating: 1000,
                wins: 1,
                losses: 1,
            },
        ];

        let entries = rank(rows);
        assert_eq!(entries[0].display_name, "alice");
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[1].display_name, "carol");
        assert!((entries[1].win_rate - 0.5).abs() < f64::EPSILON);
        assert_eq!(entries[2].display_name, "bob");
        assert_eq!(entries[2].rank, 3);
        assert!((entries[2].win_rate - 0.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn leaderboard_reflects_confirmed_match_after_invalidation() {
        let store = Arc::new(MemoryStore::default());
        let cache = Arc::new(LeaderboardCache::new(Duration::from_secs(180), 8));
        let matches = MatchService::new(store.clone(), cache.clone(), RatingSettings::default());
        let leaderboard = LeaderboardService::new(store.clone(), cache.clone());

        let alice = participant("alice");
        let bob = participant("bob");
        let (a, b) = (alice.participant_id, bob.participant_id);
        store.add_participant(alice).await;
        store.add_participant(bob).await;

        // Warm the cache while nobody holds a rating yet.
        let empty = leaderboard.get(Sport::TableTennis).await.unwrap();
        assert!(empty.is_empty());

        let m = matches.submit(Sport::TableTennis, a, b, 11, 5).await.unwrap();
        matches.confirm(m.match_id, b).await.unwrap();

        // Confirmation invalidated the sport, so the next read recomputes.
        let board = leaderboard.get(Sport::TableTennis).await.unwrap();
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].participant_id, a);
        assert_eq!(board[0].rating, 1016);
        assert_eq!(board[0].wins, 1);
        assert_eq!(board[1].participant_id, b);
        assert_eq!(board[1].rating, 984);
        assert_eq!(board[1].losses, 1);

        // Other sports were never touched.
        let other = leaderboard.get(Sport::Darts).await.unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn cache_hit_skips_recomputation() {
        let store = Arc::new(MemoryStore::default());
        let cache = Arc::new(LeaderboardCache::new(Duration::from_secs(180), 8));
        let leaderboard = LeaderboardService::new(store.clone(), cache.clone());

        let alice = participant("alice");
        let a = alice.participant_id;
        store.add_participant(alice).await;

        let first = leaderboard.get(Sport::Billiards).await.unwrap();
        // A direct store write without invalidation is invisible until TTL.
        store
            .apply_adjustment(a, Sport::Billiards, 1200, "test".to_string(), Uuid::new_v4())
            .await
            .unwrap();
        let second = leaderboard.get(Sport::Billiards).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
