//! The transactional seam between the lifecycle/admin services and the
//! relational store. Every write that touches a match status or a rating
//! field goes through one of the atomic operations below; conflicting
//! writers are serialized here, not by an in-process lock, so the service
//! can run as multiple stateless instances.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::dto::leaderboard::LeaderboardRow;
use crate::error::Result;
use crate::models::{Match, Participant, RatingAdjustment, Resolution, Sport};

/// Fields of a new pending match, validated by the lifecycle service.
#[derive(Debug, Clone)]
pub struct NewMatch {
    pub sport: Sport,
    pub player_a: Uuid,
    pub player_b: Uuid,
    pub score_a: i32,
    pub score_b: i32,
    pub winner_id: Uuid,
    pub submitted_by: Uuid,
}

/// Everything a confirmation writes besides the status flip: the rating pair
/// the deltas were computed from, and the deltas themselves.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmOutcome {
    pub rating_a_before: i32,
    pub rating_b_before: i32,
    pub delta_a: i32,
    pub delta_b: i32,
}

impl ConfirmOutcome {
    pub fn rating_a_after(&self) -> i32 {
        self.rating_a_before + self.delta_a
    }

    pub fn rating_b_after(&self) -> i32 {
        self.rating_b_before + self.delta_b
    }
}

#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn get_participant(&self, id: Uuid) -> Result<Participant>;

    /// The pending match for an unordered pair and sport, if any.
    async fn find_pending(&self, sport: Sport, one: Uuid, other: Uuid) -> Result<Option<Match>>;

    async fn insert_match(&self, new: NewMatch) -> Result<Match>;

    async fn get_match(&self, id: Uuid) -> Result<Match>;

    /// Matches a participant is part of, newest first, with the total count.
    async fn list_for_participant(
        &self,
        id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Match>, i64)>;

    /// Atomically writes both rating rows, the match's snapshot/delta fields
    /// and the confirmed status. The status flip and both rating writes are
    /// compare-and-set: a match that is no longer pending, or a rating row
    /// that moved since the outcome's `before` values were read, fails with
    /// Conflict and leaves everything untouched. Of two concurrent confirms
    /// exactly one wins; a confirm racing another rating write never applies
    /// a stale update.
    async fn confirm_match(&self, id: Uuid, outcome: ConfirmOutcome) -> Result<Match>;

    /// Deny or cancel a pending match. No rating rows are touched.
    async fn close_match(&self, id: Uuid, resolution: Resolution) -> Result<Match>;

    /// Atomically restores both participants' ratings to the match's stored
    /// before-snapshot, deletes the match and writes the audit entry (with
    /// the full pre-revert match as detail). A second call is NotFound.
    async fn revert_match(&self, id: Uuid, admin_id: Uuid) -> Result<Match>;

    /// Atomically overwrites one rating and writes the RatingAdjustment and
    /// audit entry. Returns the adjustment as recorded.
    async fn apply_adjustment(
        &self,
        participant_id: Uuid,
        sport: Sport,
        new_rating: i32,
        reason: String,
        admin_id: Uuid,
    ) -> Result<RatingAdjustment>;

    /// Toggles the suspension flag and writes the audit entry.
    async fn set_suspended(
        &self,
        participant_id: Uuid,
        suspended: bool,
        reason: Option<String>,
        admin_id: Uuid,
    ) -> Result<Participant>;

    /// Recomputes the raw leaderboard rows for one sport: everyone holding a
    /// rating in that sport, with confirmed win/loss counts. Unsorted.
    async fn leaderboard(&self, sport: Sport) -> Result<Vec<LeaderboardRow>>;
}
