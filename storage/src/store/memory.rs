//! In-memory store, used by the test suite and for local development.
//! A single RwLock guards the whole state, so the multi-row writes the
//! seam requires are atomic by construction.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ConfirmOutcome, MatchStore, NewMatch};
use crate::dto::leaderboard::LeaderboardRow;
use crate::error::{CoreError, Result};
use crate::models::{
    AuditAction, AuditLogEntry, Match, MatchStatus, Participant, RatingAdjustment, Resolution,
    Sport,
};

#[derive(Debug, Default)]
struct MemoryState {
    participants: HashMap<Uuid, Participant>,
    matches: HashMap<Uuid, Match>,
    adjustments: Vec<RatingAdjustment>,
    audit_log: Vec<AuditLogEntry>,
}

#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    default_rating: i32,
}

impl MemoryStore {
    pub fn new(default_rating: i32) -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            default_rating,
        }
    }

    /// Seeds a participant row, standing in for the directory sync.
    pub async fn add_participant(&self, participant: Participant) {
        let mut state = self.state.write().await;
        state
            .participants
            .insert(participant.participant_id, participant);
    }

    pub async fn audit_entries(&self) -> Vec<AuditLogEntry> {
        self.state.read().await.audit_log.clone()
    }

    pub async fn adjustments(&self) -> Vec<RatingAdjustment> {
        self.state.read().await.adjustments.clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(crate::services::rating::DEFAULT_RATING)
    }
}

fn audit_entry(
    action: AuditAction,
    target_kind: &str,
    target_id: Uuid,
    detail: serde_json::Value,
    actor_id: Uuid,
) -> AuditLogEntry {
    AuditLogEntry {
        entry_id: Uuid::new_v4(),
        action,
        target_kind: target_kind.to_string(),
        target_id,
        detail,
        actor_id,
        created_at: Utc::now().naive_utc(),
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn get_participant(&self, id: Uuid) -> Result<Participant> {
        let state = self.state.read().await;
        state
            .participants
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound("participant"))
    }

    async fn find_pending(&self, sport: Sport, one: Uuid, other: Uuid) -> Result<Option<Match>> {
        let state = self.state.read().await;
        Ok(state
            .matches
            .values()
            .find(|m| {
                m.sport == sport
                    && m.status == MatchStatus::Pending
                    && m.involves(one)
                    && m.involves(other)
            })
            .cloned())
    }

    async fn insert_match(&self, new: NewMatch) -> Result<Match> {
        let mut state = self.state.write().await;
        // Re-check under the write lock: the lifecycle pre-check and this
        // insert are two steps, and two submitters may race between them.
        let duplicate = state.matches.values().any(|m| {
            m.sport == new.sport
                && m.status == MatchStatus::Pending
                && m.involves(new.player_a)
                && m.involves(new.player_b)
        });
        if duplicate {
            return Err(CoreError::Conflict(format!(
                "a pending {} match already exists for this pair",
                new.sport
            )));
        }

        let m = Match {
            match_id: Uuid::new_v4(),
            sport: new.sport,
            player_a: new.player_a,
            player_b: new.player_b,
            score_a: new.score_a,
            score_b: new.score_b,
            winner_id: new.winner_id,
            status: MatchStatus::Pending,
            submitted_by: new.submitted_by,
            rating_a_before: None,
            rating_b_before: None,
            delta_a: None,
            delta_b: None,
            created_at: Utc::now().naive_utc(),
            resolved_at: None,
        };
        state.matches.insert(m.match_id, m.clone());
        Ok(m)
    }

    async fn get_match(&self, id: Uuid) -> Result<Match> {
        let state = self.state.read().await;
        state
            .matches
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound("match"))
    }

    async fn list_for_participant(
        &self,
        id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Match>, i64)> {
        let state = self.state.read().await;
        let mut matches: Vec<Match> = state
            .matches
            .values()
            .filter(|m| m.involves(id))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matches.len() as i64;
        let page = matches
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn confirm_match(&self, id: Uuid, outcome: ConfirmOutcome) -> Result<Match> {
        let mut state = self.state.write().await;
        let current = state
            .matches
            .get(&id)
            .ok_or(CoreError::NotFound("match"))?;
        if current.status != MatchStatus::Pending {
            return Err(CoreError::Conflict(format!(
                "match is {}, not pending",
                current.status
            )));
        }
        let (sport, player_a, player_b) = (current.sport, current.player_a, current.player_b);

        // Both ratings must still hold the values the outcome was computed
        // from, or another match of the same player (or an adjustment)
        // moved them since the caller's read.
        for (player, expected) in [
            (player_a, outcome.rating_a_before),
            (player_b, outcome.rating_b_before),
        ] {
            let participant = state
                .participants
                .get(&player)
                .ok_or(CoreError::NotFound("participant"))?;
            if participant.rating(sport).unwrap_or(self.default_rating) != expected {
                return Err(CoreError::Conflict(format!(
                    "{sport} rating moved while the update was computed"
                )));
            }
        }

        for (player, rating) in [
            (player_a, outcome.rating_a_after()),
            (player_b, outcome.rating_b_after()),
        ] {
            let participant = state
                .participants
                .get_mut(&player)
                .ok_or(CoreError::NotFound("participant"))?;
            participant.ratings.insert(sport, rating);
        }

        let m = state
            .matches
            .get_mut(&id)
            .ok_or(CoreError::NotFound("match"))?;
        m.status = MatchStatus::Confirmed;
        m.rating_a_before = Some(outcome.rating_a_before);
        m.rating_b_before = Some(outcome.rating_b_before);
        m.delta_a = Some(outcome.delta_a);
        m.delta_b = Some(outcome.delta_b);
        m.resolved_at = Some(Utc::now().naive_utc());
        Ok(m.clone())
    }

    async fn close_match(&self, id: Uuid, resolution: Resolution) -> Result<Match> {
        let mut state = self.state.write().await;
        let m = state
            .matches
            .get_mut(&id)
            .ok_or(CoreError::NotFound("match"))?;
        if m.status != MatchStatus::Pending {
            return Err(CoreError::Conflict(format!(
                "match is {}, not pending",
                m.status
            )));
        }
        m.status = resolution.status();
        m.resolved_at = Some(Utc::now().naive_utc());
        Ok(m.clone())
    }

    async fn revert_match(&self, id: Uuid, admin_id: Uuid) -> Result<Match> {
        let mut state = self.state.write().await;
        let current = state
            .matches
            .get(&id)
            .ok_or(CoreError::NotFound("match"))?;
        if current.status != MatchStatus::Confirmed {
            return Err(CoreError::Conflict(format!(
                "only confirmed matches can be reverted, match is {}",
                current.status
            )));
        }
        let (Some(rating_a), Some(rating_b)) = (current.rating_a_before, current.rating_b_before)
        else {
            return Err(CoreError::Internal(
                "confirmed match is missing its rating snapshot".to_string(),
            ));
        };
        let m = current.clone();

        for (player, rating) in [(m.player_a, rating_a), (m.player_b, rating_b)] {
            let participant = state
                .participants
                .get_mut(&player)
                .ok_or(CoreError::NotFound("participant"))?;
            participant.ratings.insert(m.sport, rating);
        }
        state.matches.remove(&id);

        let detail = serde_json::to_value(&m)
            .map_err(|e| CoreError::Internal(format!("failed to serialize match: {e}")))?;
        let entry = audit_entry(AuditAction::RevertMatch, "match", id, detail, admin_id);
        state.audit_log.push(entry);
        Ok(m)
    }

    async fn apply_adjustment(
        &self,
        participant_id: Uuid,
        sport: Sport,
        new_rating: i32,
        reason: String,
        admin_id: Uuid,
    ) -> Result<RatingAdjustment> {
        let mut state = self.state.write().await;
        let default_rating = self.default_rating;
        let participant = state
            .participants
            .get_mut(&participant_id)
            .ok_or(CoreError::NotFound("participant"))?;
        let old_rating = participant
            .rating(sport)
            .unwrap_or(default_rating);
        participant.ratings.insert(sport, new_rating);

        let adjustment = RatingAdjustment {
            adjustment_id: Uuid::new_v4(),
            participant_id,
            sport,
            old_rating,
            new_rating,
            reason,
            admin_id,
            created_at: Utc::now().naive_utc(),
        };
        let detail = serde_json::to_value(&adjustment)
            .map_err(|e| CoreError::Internal(format!("failed to serialize adjustment: {e}")))?;
        state.adjustments.push(adjustment.clone());
        let entry = audit_entry(
            AuditAction::AdjustRating,
            "participant",
            participant_id,
            detail,
            admin_id,
        );
        state.audit_log.push(entry);
        Ok(adjustment)
    }

    async fn set_suspended(
        &self,
        participant_id: Uuid,
        suspended: bool,
        reason: Option<String>,
        admin_id: Uuid,
    ) -> Result<Participant> {
        let mut state = self.state.write().await;
        let participant = state
            .participants
            .get_mut(&participant_id)
            .ok_or(CoreError::NotFound("participant"))?;
        participant.suspended = suspended;
        participant.suspended_reason = reason.clone();
        let updated = participant.clone();

        let action = if suspended {
            AuditAction::BanParticipant
        } else {
            AuditAction::UnbanParticipant
        };
        let entry = audit_entry(
            action,
            "participant",
            participant_id,
            serde_json::json!({ "suspended": suspended, "reason": reason }),
            admin_id,
        );
        state.audit_log.push(entry);
        Ok(updated)
    }

    async fn leaderboard(&self, sport: Sport) -> Result<Vec<LeaderboardRow>> {
        let state = self.state.read().await;
        let mut rows = Vec::new();
        for participant in state.participants.values() {
            let Some(rating) = participant.rating(sport) else {
                continue;
            };
            let mut wins = 0i64;
            let mut losses = 0i64;
            for m in state.matches.values() {
                if m.sport != sport
                    || m.status != MatchStatus::Confirmed
                    || !m.involves(participant.participant_id)
                {
                    continue;
                }
                if m.winner_id == participant.participant_id {
                    wins += 1;
                } else {
                    losses += 1;
                }
            }
            rows.push(LeaderboardRow {
                participant_id: participant.participant_id,
                display_name: participant.display_name.clone(),
                rating,
                wins,
                losses,
            });
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    async fn pending_match(store: &MemoryStore, sport: Sport, winner: Uuid, loser: Uuid) -> Match {
        store
            .insert_match(NewMatch {
                sport,
                player_a: winner,
                player_b: loser,
                score_a: 11,
                score_b: 5,
                winner_id: winner,
                submitted_by: winner,
            })
            .await
            .unwrap()
    }

    fn even_win() -> ConfirmOutcome {
        ConfirmOutcome {
            rating_a_before: 1000,
            rating_b_before: 1000,
            delta_a: 16,
            delta_b: -16,
        }
    }

    #[tokio::test]
    async fn confirm_match_rejects_a_stale_rating_snapshot() {
        let store = MemoryStore::default();
        let alice = participant("alice");
        let bob = participant("bob");
        let (a, b) = (alice.participant_id, bob.participant_id);
        store.add_participant(alice).await;
        store.add_participant(bob).await;
        let m = pending_match(&store, Sport::Darts, a, b).await;

        // Moves alice's rating after the outcome above was computed.
        store
            .apply_adjustment(a, Sport::Darts, 1040, "seeding".to_string(), Uuid::new_v4())
            .await
            .unwrap();

        let err = store.confirm_match(m.match_id, even_win()).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));

        // Nothing was written: the match is still pending and both ratings
        // are what the adjustment left them at.
        let kept = store.get_match(m.match_id).await.unwrap();
        assert_eq!(kept.status, MatchStatus::Pending);
        assert_eq!(kept.rating_a_before, None);
        let alice = store.get_participant(a).await.unwrap();
        let bob = store.get_participant(b).await.unwrap();
        assert_eq!(alice.rating(Sport::Darts), Some(1040));
        assert_eq!(bob.rating(Sport::Darts), None);
    }

    #[tokio::test]
    async fn overlapping_confirms_of_a_shared_player_cannot_drop_an_update() {
        let store = MemoryStore::default();
        let alice = participant("alice");
        let bob = participant("bob");
        let carol = participant("carol");
        let (a, b, c) = (
            alice.participant_id,
            bob.participant_id,
            carol.participant_id,
        );
        store.add_participant(alice).await;
        store.add_participant(bob).await;
        store.add_participant(carol).await;

        // Two pending matches of alice, both outcomes computed from her
        // rating before either confirm landed.
        let first = pending_match(&store, Sport::TableTennis, a, b).await;
        let second = pending_match(&store, Sport::TableTennis, a, c).await;

        store.confirm_match(first.match_id, even_win()).await.unwrap();

        // The second write must not overwrite 1016 with 1016 as if the
        // first win never happened.
        let err = store
            .confirm_match(second.match_id, even_win())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));

        let alice = store.get_participant(a).await.unwrap();
        assert_eq!(alice.rating(Sport::TableTennis), Some(1016));
        let kept = store.get_match(second.match_id).await.unwrap();
        assert_eq!(kept.status, MatchStatus::Pending);
    }
}
