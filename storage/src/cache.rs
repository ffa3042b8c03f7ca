//! Time-bounded read cache for computed leaderboards. One entry per sport,
//! many concurrent readers, brief exclusive writes for fill/evict/invalidate.
//! A periodic sweep keeps memory bounded even without write traffic.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::dto::leaderboard::LeaderboardEntry;
use crate::models::Sport;

#[derive(Debug, Clone)]
struct CacheEntry {
    inserted_at: Instant,
    entries: Arc<Vec<LeaderboardEntry>>,
}

#[derive(Debug)]
pub struct LeaderboardCache {
    entries: RwLock<HashMap<Sport, CacheEntry>>,
    ttl: Duration,
    capacity: usize,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl LeaderboardCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
            sweeper: Mutex::new(None),
        }
    }

    /// Cached leaderboard for a sport, unless absent or past its TTL.
    pub async fn get(&self, sport: Sport) -> Option<Arc<Vec<LeaderboardEntry>>> {
        let entries = self.entries.read().await;
        let entry = entries.get(&sport)?;
        if entry.inserted_at.elapsed() >= self.ttl {
            return None;
        }
        Some(Arc::clone(&entry.entries))
    }

    /// Stores a freshly computed leaderboard, evicting expired entries first
    /// and then the oldest one if the capacity is still exceeded.
    pub async fn put(
        &self,
        sport: Sport,
        leaderboard: Vec<LeaderboardEntry>,
    ) -> Arc<Vec<LeaderboardEntry>> {
        let shared = Arc::new(leaderboard);
        let mut entries = self.entries.write().await;

        if !entries.contains_key(&sport) && entries.len() >= self.capacity {
            entries.retain(|_, e| e.inserted_at.elapsed() < self.ttl);
            if entries.len() >= self.capacity {
                if let Some(oldest) = entries
                    .iter()
                    .min_by_key(|(_, e)| e.inserted_at)
                    .map(|(sport, _)| *sport)
                {
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(
            sport,
            CacheEntry {
                inserted_at: Instant::now(),
                entries: Arc::clone(&shared),
            },
        );
        shared
    }

    /// Drops one sport's entry. Called after every committed rating change.
    pub async fn invalidate(&self, sport: Sport) {
        let mut entries = self.entries.write().await;
        entries.remove(&sport);
    }

    /// Spawns the periodic expiry sweep. At most one sweeper runs; calling
    /// this again while one is active is a no-op.
    pub async fn start_sweep(self: &Arc<Self>, every: Duration) {
        let mut sweeper = self.sweeper.lock().await;
        if sweeper.is_some() {
            return;
        }
        let cache = Arc::clone(self);
        *sweeper = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await;
            loop {
                interval.tick().await;
                let removed = cache.sweep().await;
                if removed > 0 {
                    tracing::debug!(removed, "leaderboard cache sweep");
                }
            }
        }));
    }

    /// Stops the sweep task. Safe to call more than once.
    pub async fn shutdown(&self) {
        let mut sweeper = self.sweeper.lock().await;
        if let Some(handle) = sweeper.take() {
            handle.abort();
        }
    }

    async fn sweep(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.inserted_at.elapsed() < self.ttl);
        before - entries.len()
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(rating: i32) -> Vec<LeaderboardEntry> {
        vec![LeaderboardEntry {
            rank: 1,
            participant_id: uuid::Uuid::new_v4(),
            display_name: "alice".to_string(),
            rating,
            wins: 1,
            losses: 0,
            win_rate: 1.0,
        }]
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = LeaderboardCache::new(Duration::from_secs(180), 8);
        cache.put(Sport::TableTennis, board(1016)).await;
        assert!(cache.get(Sport::TableTennis).await.is_some());

        tokio::time::advance(Duration::from_secs(179)).await;
        assert!(cache.get(Sport::TableTennis).await.is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get(Sport::TableTennis).await.is_none());
    }

    #[tokio::test]
    async fn invalidate_removes_only_that_sport() {
        let cache = LeaderboardCache::new(Duration::from_secs(180), 8);
        cache.put(Sport::TableTennis, board(1016)).await;
        cache.put(Sport::Darts, board(1100)).await;

        cache.invalidate(Sport::TableTennis).await;
        assert!(cache.get(Sport::TableTennis).await.is_none());
        assert!(cache.get(Sport::Darts).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn capacity_evicts_oldest_first() {
        let cache = LeaderboardCache::new(Duration::from_secs(600), 2);
        cache.put(Sport::TableTennis, board(1)).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.put(Sport::Darts, board(2)).await;
        tokio::time::advance(Duration::from_secs(1)).await;

        cache.put(Sport::Billiards, board(3)).await;
        assert_eq!(cache.len().await, 2);
        assert!(cache.get(Sport::TableTennis).await.is_none());
        assert!(cache.get(Sport::Darts).await.is_some());
        assert!(cache.get(Sport::Billiards).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn capacity_prefers_evicting_expired_entries() {
        let cache = LeaderboardCache::new(Duration::from_secs(10), 2);
        cache.put(Sport::TableTennis, board(1)).await;
        tokio::time::advance(Duration::from_secs(11)).await;
        cache.put(Sport::Darts, board(2)).await;

        cache.put(Sport::Billiards, board(3)).await;
        assert!(cache.get(Sport::Darts).await.is_some());
        assert!(cache.get(Sport::Billiards).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_removes_expired_entries_without_reads() {
        let cache = Arc::new(LeaderboardCache::new(Duration::from_secs(10), 8));
        cache.put(Sport::TableTennis, board(1)).await;
        cache.start_sweep(Duration::from_secs(30)).await;

        tokio::time::advance(Duration::from_secs(31)).await;
        tokio::task::yield_now().await;
        assert_eq!(cache.len().await, 0);

        cache.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_twice_is_a_no_op() {
        let cache = Arc::new(LeaderboardCache::new(Duration::from_secs(10), 8));
        cache.start_sweep(Duration::from_secs(30)).await;
        cache.shutdown().await;
        cache.shutdown().await;
    }

    #[tokio::test]
    async fn put_returns_the_shared_list() {
        let cache = LeaderboardCache::new(Duration::from_secs(180), 8);
        let stored = cache.put(Sport::TableTennis, board(1016)).await;
        let read = cache.get(Sport::TableTennis).await.unwrap();
        assert!(Arc::ptr_eq(&stored, &read));
    }
}
