//! Administrative overrides: manual rating adjustment, match reversal and
//! suspension. These bypass the opponent-confirmation rules but share the
//! store's atomic writes and always leave an audit trail.

use std::sync::Arc;

use uuid::Uuid;

use crate::cache::LeaderboardCache;
use crate::error::{CoreError, Result};
use crate::models::{Actor, Match, Participant, RatingAdjustment, Sport};
use crate::store::MatchStore;

#[derive(Clone)]
pub struct AdminService {
    store: Arc<dyn MatchStore>,
    cache: Arc<LeaderboardCache>,
}

impl AdminService {
    pub fn new(store: Arc<dyn MatchStore>, cache: Arc<LeaderboardCache>) -> Self {
        Self { store, cache }
    }

    /// Overwrites one participant's rating for one sport, independent of any
    /// match. Undoing it takes a second adjustment.
    pub async fn adjust_rating(
        &self,
        actor: Actor,
        participant_id: Uuid,
        sport: Sport,
        new_rating: i32,
        reason: String,
    ) -> Result<RatingAdjustment> {
        self.ensure_admin(actor)?;
        if reason.trim().is_empty() {
            return Err(CoreError::Validation(
                "an adjustment needs a reason".to_string(),
            ));
        }

        let adjustment = self
            .store
            .apply_adjustment(
                participant_id,
                sport,
                new_rating,
                reason,
                actor.participant_id,
            )
            .await?;
        self.cache.invalidate(sport).await;

        tracing::warn!(
            participant = %participant_id,
            %sport,
            old_rating = adjustment.old_rating,
            new_rating,
            admin = %actor.participant_id,
            "rating adjusted manually"
        );
        Ok(adjustment)
    }

    /// Compensates a confirmed match: restores both players to the stored
    /// before-snapshot and removes the match. A second call is NotFound.
    pub async fn revert_match(&self, actor: Actor, match_id: Uuid) -> Result<Match> {
        self.ensure_admin(actor)?;

        let reverted = self
            .store
            .revert_match(match_id, actor.participant_id)
            .await?;
        self.cache.invalidate(reverted.sport).await;

        tracing::warn!(
            match_id = %match_id,
            sport = %reverted.sport,
            admin = %actor.participant_id,
            "confirmed match reverted"
        );
        Ok(reverted)
    }

    /// Suspends a participant. Past matches and ratings stay as they are.
    pub async fn ban(
        &self,
        actor: Actor,
        participant_id: Uuid,
        reason: String,
    ) -> Result<Participant> {
        self.ensure_admin(actor)?;
        if participant_id == actor.participant_id {
            return Err(CoreError::Permission(
                "administrators cannot ban themselves".to_string(),
            ));
        }
        let target = self.store.get_participant(participant_id).await?;
        if target.is_admin {
            return Err(CoreError::Permission(
                "administrators cannot be banned".to_string(),
            ));
        }

        let banned = self
            .store
            .set_suspended(participant_id, true, Some(reason), actor.participant_id)
            .await?;
        tracing::warn!(participant = %participant_id, admin = %actor.participant_id, "participant banned");
        Ok(banned)
    }

    pub async fn unban(&self, actor: Actor, participant_id: Uuid) -> Result<Participant> {
        self.ensure_admin(actor)?;
        let unbanned = self
            .store
            .set_suspended(participant_id, false, None, actor.participant_id)
            .await?;
        tracing::info!(participant = %participant_id, admin = %actor.participant_id, "participant unbanned");
        Ok(unbanned)
    }

    fn ensure_admin(&self, actor: Actor) -> Result<()> {
        if !actor.is_admin {
            return Err(CoreError::Permission(
                "administrator privileges required".to_string(),
            ));
        }
        Ok(())
    }
}
