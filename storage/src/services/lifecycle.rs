//! The match lifecycle: submit, then exactly one of confirm, deny or
//! cancel. All validation and actor checks happen before any write; the
//! confirm write itself is a single atomic store operation.

use std::sync::Arc;

use uuid::Uuid;

use crate::cache::LeaderboardCache;
use crate::error::{CoreError, Result};
use crate::models::{Match, MatchStatus, Resolution, Sport};
use crate::services::rating::{self, RatingSettings, RatingUpdate};
use crate::store::{ConfirmOutcome, MatchStore, NewMatch};

/// How often a confirm re-reads and recomputes after its compare-and-set
/// write loses to a concurrent rating update.
const CONFIRM_ATTEMPTS: u32 = 3;

#[derive(Clone)]
pub struct MatchService {
    store: Arc<dyn MatchStore>,
    cache: Arc<LeaderboardCache>,
    settings: RatingSettings,
}

impl MatchService {
    pub fn new(
        store: Arc<dyn MatchStore>,
        cache: Arc<LeaderboardCache>,
        settings: RatingSettings,
    ) -> Self {
        Self {
            store,
            cache,
            settings,
        }
    }

    /// Records a new pending match. The submitter's opponent has to confirm
    /// it before it counts.
    pub async fn submit(
        &self,
        sport: Sport,
        submitter: Uuid,
        opponent: Uuid,
        submitter_score: i32,
        opponent_score: i32,
    ) -> Result<Match> {
        if submitter == opponent {
            return Err(CoreError::Validation(
                "a match needs two distinct participants".to_string(),
            ));
        }
        if submitter_score < 0 || opponent_score < 0 {
            return Err(CoreError::Validation(
                "scores must be non-negative".to_string(),
            ));
        }
        if submitter_score == opponent_score {
            return Err(CoreError::Validation(
                "tied scores are not recorded, play it out".to_string(),
            ));
        }

        let submitting = self.store.get_participant(submitter).await?;
        let opposing = self.store.get_participant(opponent).await?;
        for p in [&submitting, &opposing] {
            if p.suspended {
                return Err(CoreError::Permission(format!(
                    "{} is suspended",
                    p.display_name
                )));
            }
        }

        if self
            .store
            .find_pending(sport, submitter, opponent)
            .await?
            .is_some()
        {
            return Err(CoreError::Conflict(format!(
                "a pending {sport} match already exists for this pair"
            )));
        }

        let winner_id = if submitter_score > opponent_score {
            submitter
        } else {
            opponent
        };
        let m = self
            .store
            .insert_match(NewMatch {
                sport,
                player_a: submitter,
                player_b: opponent,
                score_a: submitter_score,
                score_b: opponent_score,
                winner_id,
                submitted_by: submitter,
            })
            .await?;

        tracing::info!(
            match_id = %m.match_id,
            %sport,
            submitter = %submitter,
            opponent = %opponent,
            "match submitted"
        );
        Ok(m)
    }

    /// Confirms a pending match, applying the rating update to both players
    /// and the status flip in one atomic write. The write compare-and-sets
    /// the rating rows, so when it loses to a concurrent rating change of
    /// the same player (another match of theirs, or an admin adjustment)
    /// the ratings are re-read and the update recomputed.
    pub async fn confirm(&self, match_id: Uuid, actor: Uuid) -> Result<Match> {
        let m = self.store.get_match(match_id).await?;
        self.ensure_pending(&m)?;
        self.ensure_opponent(&m, actor)?;

        let mut attempts = 0;
        let (confirmed, update) = loop {
            attempts += 1;
            match self.try_confirm(&m).await {
                Ok(done) => break done,
                Err(CoreError::Conflict(reason)) => {
                    // A status flip is final; only a moved rating is retried.
                    let current = self.store.get_match(match_id).await?;
                    if current.status != MatchStatus::Pending || attempts >= CONFIRM_ATTEMPTS {
                        return Err(CoreError::Conflict(reason));
                    }
                    tracing::debug!(match_id = %match_id, attempts, "recomputing confirm after rating conflict");
                }
                Err(e) => return Err(e),
            }
        };

        // Invalidate only after the write committed.
        self.cache.invalidate(m.sport).await;

        tracing::info!(
            match_id = %match_id,
            sport = %m.sport,
            delta_a = update.delta_a,
            delta_b = update.delta_b,
            "match confirmed"
        );
        Ok(confirmed)
    }

    /// One read-compute-write attempt of the confirm.
    async fn try_confirm(&self, m: &Match) -> Result<(Match, RatingUpdate)> {
        let player_a = self.store.get_participant(m.player_a).await?;
        let player_b = self.store.get_participant(m.player_b).await?;
        let rating_a = player_a
            .rating(m.sport)
            .unwrap_or(self.settings.default_rating);
        let rating_b = player_b
            .rating(m.sport)
            .unwrap_or(self.settings.default_rating);

        let update =
            rating::compute_update(rating_a, rating_b, m.winner_id == m.player_a, self.settings.k_factor);

        let confirmed = self
            .store
            .confirm_match(
                m.match_id,
                ConfirmOutcome {
                    rating_a_before: update.rating_a_before,
                    rating_b_before: update.rating_b_before,
                    delta_a: update.delta_a,
                    delta_b: update.delta_b,
                },
            )
            .await?;
        Ok((confirmed, update))
    }

    /// The opponent rejects the submitted result. Ratings stay untouched.
    pub async fn deny(&self, match_id: Uuid, actor: Uuid) -> Result<Match> {
        let m = self.store.get_match(match_id).await?;
        self.ensure_pending(&m)?;
        self.ensure_opponent(&m, actor)?;

        let denied = self.store.close_match(match_id, Resolution::Denied).await?;
        tracing::info!(match_id = %match_id, actor = %actor, "match denied");
        Ok(denied)
    }

    /// The submitter withdraws their own pending submission.
    pub async fn cancel(&self, match_id: Uuid, actor: Uuid) -> Result<Match> {
        let m = self.store.get_match(match_id).await?;
        self.ensure_pending(&m)?;
        if m.submitted_by != actor {
            return Err(CoreError::Permission(
                "only the submitter may cancel a match".to_string(),
            ));
        }

        let cancelled = self
            .store
            .close_match(match_id, Resolution::Cancelled)
            .await?;
        tracing::info!(match_id = %match_id, "match cancelled");
        Ok(cancelled)
    }

    pub async fn list_for(
        &self,
        participant: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Match>, i64)> {
        self.store.list_for_participant(participant, limit, offset).await
    }

    fn ensure_pending(&self, m: &Match) -> Result<()> {
        if m.status != MatchStatus::Pending {
            return Err(CoreError::Conflict(format!(
                "match is {}, not pending",
                m.status
            )));
        }
        Ok(())
    }

    /// Only the non-submitting player may confirm or deny. The submitter
    /// resolving their own match would make ratings unilaterally farmable.
    fn ensure_opponent(&self, m: &Match, actor: Uuid) -> Result<()> {
        if actor == m.submitted_by {
            return Err(CoreError::Permission(
                "the submitter cannot resolve their own match".to_string(),
            ));
        }
        if !m.involves(actor) {
            return Err(CoreError::Permission(
                "only the opposing participant may resolve this match".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::dto::leaderboard::LeaderboardRow;
    use crate::models::{Participant, RatingAdjustment};
    use crate::store::memory::MemoryStore;

    fn participant(name: &str) -> Participant {
        Participant {
            participant_id: Uuid::new_v4(),
            display_name: name.to_string(),
            campus: Some("north".to_string()),
            is_admin: false,
            suspended: false,
            suspended_reason: None,
            created_at: Utc::now().naive_utc(),
            ratings: HashMap::new(),
        }
    }

    async fn setup() -> (MatchService, Arc<MemoryStore>, Uuid, Uuid) {
        let store = Arc::new(MemoryStore::default());
        let alice = participant("alice");
        let bob = participant("bob");
        let (a, b) = (alice.participant_id, bob.participant_id);
        store.add_participant(alice).await;
        store.add_participant(bob).await;

        let cache = Arc::new(LeaderboardCache::new(Duration::from_secs(60), 8));
        let service = MatchService::new(store.clone(), cache, RatingSettings::default());
        (service, store, a, b)
    }

    #[tokio::test]
    async fn submit_rejects_self_match() {
        let (service, _, a, _) = setup().await;
        let err = service
            .submit(Sport::TableTennis, a, a, 11, 5)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn submit_rejects_tied_scores() {
        let (service, _, a, b) = setup().await;
        let err = service
            .submit(Sport::TableTennis, a, b, 7, 7)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn submit_rejects_negative_scores() {
        let (service, _, a, b) = setup().await;
        let err = service
            .submit(Sport::TableTennis, a, b, -1, 5)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn submit_rejects_unknown_opponent() {
        let (service, _, a, _) = setup().await;
        let err = service
            .submit(Sport::TableTennis, a, Uuid::new_v4(), 11, 5)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound("participant")));
    }

    #[tokio::test]
    async fn second_pending_match_for_pair_conflicts_in_either_order() {
        let (service, _, a, b) = setup().await;
        service.submit(Sport::Darts, a, b, 301, 250).await.unwrap();

        let err = service.submit(Sport::Darts, a, b, 301, 180).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));

        // Reversed pair is the same unordered pair.
        let err = service.submit(Sport::Darts, b, a, 301, 180).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));

        // A different sport is fine.
        service.submit(Sport::Billiards, a, b, 8, 3).await.unwrap();
    }

    #[tokio::test]
    async fn submitter_cannot_confirm_or_deny_own_match() {
        let (service, _, a, b) = setup().await;
        let m = service.submit(Sport::TableTennis, a, b, 11, 5).await.unwrap();

        let err = service.confirm(m.match_id, a).await.unwrap_err();
        assert!(matches!(err, CoreError::Permission(_)));
        let err = service.deny(m.match_id, a).await.unwrap_err();
        assert!(matches!(err, CoreError::Permission(_)));
    }

    #[tokio::test]
    async fn unrelated_participant_cannot_confirm() {
        let (service, store, a, b) = setup().await;
        let carol = participant("carol");
        let c = carol.participant_id;
        store.add_participant(carol).await;

        let m = service.submit(Sport::TableTennis, a, b, 11, 5).await.unwrap();
        let err = service.confirm(m.match_id, c).await.unwrap_err();
        assert!(matches!(err, CoreError::Permission(_)));
    }

    #[tokio::test]
    async fn confirm_applies_elo_to_both_players() {
        let (service, store, a, b) = setup().await;
        let m = service.submit(Sport::TableTennis, a, b, 11, 5).await.unwrap();
        let confirmed = service.confirm(m.match_id, b).await.unwrap();

        assert_eq!(confirmed.status, MatchStatus::Confirmed);
        assert_eq!(confirmed.rating_a_before, Some(1000));
        assert_eq!(confirmed.rating_b_before, Some(1000));
        assert_eq!(confirmed.delta_a, Some(16));
        assert_eq!(confirmed.delta_b, Some(-16));
        assert!(confirmed.resolved_at.is_some());

        let alice = store.get_participant(a).await.unwrap();
        let bob = store.get_participant(b).await.unwrap();
        assert_eq!(alice.rating(Sport::TableTennis), Some(1016));
        assert_eq!(bob.rating(Sport::TableTennis), Some(984));
    }

    #[tokio::test]
    async fn confirm_leaves_other_sports_alone() {
        let (service, store, a, b) = setup().await;
        let m = service.submit(Sport::TableTennis, a, b, 11, 5).await.unwrap();
        service.confirm(m.match_id, b).await.unwrap();

        let alice = store.get_participant(a).await.unwrap();
        assert_eq!(alice.rating(Sport::TableFootball), None);
        assert_eq!(alice.rating(Sport::Darts), None);
    }

    #[tokio::test]
    async fn confirm_twice_conflicts() {
        let (service, _, a, b) = setup().await;
        let m = service.submit(Sport::TableTennis, a, b, 11, 5).await.unwrap();
        service.confirm(m.match_id, b).await.unwrap();

        let err = service.confirm(m.match_id, b).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn deny_changes_no_ratings() {
        let (service, store, a, b) = setup().await;
        let m = service.submit(Sport::TableTennis, a, b, 11, 5).await.unwrap();
        let denied = service.deny(m.match_id, b).await.unwrap();

        assert_eq!(denied.status, MatchStatus::Denied);
        assert_eq!(denied.delta_a, None);
        let alice = store.get_participant(a).await.unwrap();
        let bob = store.get_participant(b).await.unwrap();
        assert!(alice.ratings.is_empty());
        assert!(bob.ratings.is_empty());
    }

    #[tokio::test]
    async fn only_submitter_may_cancel() {
        let (service, _, a, b) = setup().await;
        let m = service.submit(Sport::TableTennis, a, b, 11, 5).await.unwrap();

        let err = service.cancel(m.match_id, b).await.unwrap_err();
        assert!(matches!(err, CoreError::Permission(_)));

        let cancelled = service.cancel(m.match_id, a).await.unwrap();
        assert_eq!(cancelled.status, MatchStatus::Cancelled);
    }

    #[tokio::test]
    async fn suspended_participant_cannot_submit() {
        let (service, store, a, b) = setup().await;
        let admin = Uuid::new_v4();
        store
            .set_suspended(a, true, Some("abuse".to_string()), admin)
            .await
            .unwrap();

        let err = service.submit(Sport::TableTennis, a, b, 11, 5).await.unwrap_err();
        assert!(matches!(err, CoreError::Permission(_)));
    }

    #[tokio::test]
    async fn confirm_after_deny_conflicts() {
        let (service, _, a, b) = setup().await;
        let m = service.submit(Sport::TableTennis, a, b, 11, 5).await.unwrap();
        service.deny(m.match_id, b).await.unwrap();

        let err = service.confirm(m.match_id, b).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn unknown_match_is_not_found() {
        let (service, _, _, b) = setup().await;
        let err = service.confirm(Uuid::new_v4(), b).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound("match")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_confirms_resolve_to_exactly_one_winner() {
        for _ in 0..20 {
            let (service, store, a, b) = setup().await;
            let m = service.submit(Sport::TableTennis, a, b, 11, 5).await.unwrap();

            let s1 = service.clone();
            let s2 = service.clone();
            let id = m.match_id;
            let first = tokio::spawn(async move { s1.confirm(id, b).await });
            let second = tokio::spawn(async move { s2.confirm(id, b).await });
            let (r1, r2) = (first.await.unwrap(), second.await.unwrap());

            let oks = [&r1, &r2].iter().filter(|r| r.is_ok()).count();
            assert_eq!(oks, 1, "exactly one confirm must win");
            let loser = if r1.is_ok() { r2 } else { r1 };
            assert!(matches!(loser.unwrap_err(), CoreError::Conflict(_)));

            // No double application.
            let alice = store.get_participant(a).await.unwrap();
            let bob = store.get_participant(b).await.unwrap();
            assert_eq!(alice.rating(Sport::TableTennis), Some(1016));
            assert_eq!(bob.rating(Sport::TableTennis), Some(984));
        }
    }

    /// Delegates to a MemoryStore, but moves one player's rating right
    /// before the first confirm write lands, the way a confirm of that
    /// player's other match would between a read and the write.
    struct RatingShiftStore {
        inner: Arc<MemoryStore>,
        player: Uuid,
        shifted: AtomicBool,
    }

    #[async_trait]
    impl MatchStore for RatingShiftStore {
        async fn get_participant(&self, id: Uuid) -> Result<Participant> {
            self.inner.get_participant(id).await
        }

        async fn find_pending(&self, sport: Sport, one: Uuid, other: Uuid) -> Result<Option<Match>> {
            self.inner.find_pending(sport, one, other).await
        }

        async fn insert_match(&self, new: NewMatch) -> Result<Match> {
            self.inner.insert_match(new).await
        }

        async fn get_match(&self, id: Uuid) -> Result<Match> {
            self.inner.get_match(id).await
        }

        async fn list_for_participant(
            &self,
            id: Uuid,
            limit: i64,
            offset: i64,
        ) -> Result<(Vec<Match>, i64)> {
            self.inner.list_for_participant(id, limit, offset).await
        }

        async fn confirm_match(&self, id: Uuid, outcome: ConfirmOutcome) -> Result<Match> {
            if !self.shifted.swap(true, Ordering::SeqCst) {
                self.inner
                    .apply_adjustment(
                        self.player,
                        Sport::TableTennis,
                        1100,
                        "seeding".to_string(),
                        Uuid::new_v4(),
                    )
                    .await?;
            }
            self.inner.confirm_match(id, outcome).await
        }

        async fn close_match(&self, id: Uuid, resolution: Resolution) -> Result<Match> {
            self.inner.close_match(id, resolution).await
        }

        async fn revert_match(&self, id: Uuid, admin_id: Uuid) -> Result<Match> {
            self.inner.revert_match(id, admin_id).await
        }

        async fn apply_adjustment(
            &self,
            participant_id: Uuid,
            sport: Sport,
            new_rating: i32,
            reason: String,
            admin_id: Uuid,
        ) -> Result<RatingAdjustment> {
            self.inner
                .apply_adjustment(participant_id, sport, new_rating, reason, admin_id)
                .await
        }

        async fn set_suspended(
            &self,
            participant_id: Uuid,
            suspended: bool,
            reason: Option<String>,
            admin_id: Uuid,
        ) -> Result<Participant> {
            self.inner
                .set_suspended(participant_id, suspended, reason, admin_id)
                .await
        }

        async fn leaderboard(&self, sport: Sport) -> Result<Vec<LeaderboardRow>> {
            self.inner.leaderboard(sport).await
        }
    }

    #[tokio::test]
    async fn confirm_recomputes_when_a_rating_moves_mid_flight() {
        let inner = Arc::new(MemoryStore::default());
        let alice = participant("alice");
        let bob = participant("bob");
        let (a, b) = (alice.participant_id, bob.participant_id);
        inner.add_participant(alice).await;
        inner.add_participant(bob).await;

        let store = Arc::new(RatingShiftStore {
            inner: inner.clone(),
            player: a,
            shifted: AtomicBool::new(false),
        });
        let cache = Arc::new(LeaderboardCache::new(Duration::from_secs(60), 8));
        let service = MatchService::new(store, cache, RatingSettings::default());

        let m = service.submit(Sport::TableTennis, a, b, 11, 5).await.unwrap();
        let confirmed = service.confirm(m.match_id, b).await.unwrap();

        // The 1000-based update was rejected by the store; the applied one
        // was recomputed from the moved rating.
        assert_eq!(confirmed.rating_a_before, Some(1100));
        assert_eq!(confirmed.rating_b_before, Some(1000));
        assert_eq!(confirmed.delta_a, Some(12));
        assert_eq!(confirmed.delta_b, Some(-12));

        let alice = inner.get_participant(a).await.unwrap();
        let bob = inner.get_participant(b).await.unwrap();
        assert_eq!(alice.rating(Sport::TableTennis), Some(1112));
        assert_eq!(bob.rating(Sport::TableTennis), Some(988));
    }

    #[tokio::test]
    async fn list_for_returns_both_sides_newest_first() {
        let (service, _, a, b) = setup().await;
        let first = service.submit(Sport::TableTennis, a, b, 11, 5).await.unwrap();
        service.confirm(first.match_id, b).await.unwrap();
        service.submit(Sport::Darts, b, a, 301, 100).await.unwrap();

        let (mine, total) = service.list_for(a, 50, 0).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(mine.len(), 2);
        let (theirs, _) = service.list_for(b, 1, 0).await.unwrap();
        assert_eq!(theirs.len(), 1);
    }
}
