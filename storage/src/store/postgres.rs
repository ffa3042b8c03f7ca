//! Postgres-backed store. Every multi-row write runs in one transaction;
//! status transitions and rating writes use conditional UPDATEs so
//! concurrent writers resolve at the database rather than in process.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{ConfirmOutcome, MatchStore, NewMatch};
use crate::dto::leaderboard::LeaderboardRow;
use crate::error::{CoreError, Result};
use crate::models::{
    AuditAction, Match, MatchStatus, Participant, RatingAdjustment, Resolution, Sport,
};

#[derive(Debug, Clone)]
pub struct PgMatchStore {
    pool: PgPool,
    default_rating: i32,
}

impl PgMatchStore {
    pub fn new(pool: PgPool, default_rating: i32) -> Self {
        Self {
            pool,
            default_rating,
        }
    }
}

#[derive(FromRow)]
struct MatchRow {
    match_id: Uuid,
    sport: String,
    player_a: Uuid,
    player_b: Uuid,
    score_a: i32,
    score_b: i32,
    winner_id: Uuid,
    status: String,
    submitted_by: Uuid,
    rating_a_before: Option<i32>,
    rating_b_before: Option<i32>,
    delta_a: Option<i32>,
    delta_b: Option<i32>,
    created_at: chrono::NaiveDateTime,
    resolved_at: Option<chrono::NaiveDateTime>,
}

impl TryFrom<MatchRow> for Match {
    type Error = CoreError;

    fn try_from(row: MatchRow) -> Result<Self> {
        let sport = Sport::from_str(&row.sport)
            .map_err(|_| CoreError::Internal(format!("stored match has sport '{}'", row.sport)))?;
        let status = MatchStatus::from_str(&row.status).map_err(CoreError::Internal)?;
        Ok(Match {
            match_id: row.match_id,
            sport,
            player_a: row.player_a,
            player_b: row.player_b,
            score_a: row.score_a,
            score_b: row.score_b,
            winner_id: row.winner_id,
            status,
            submitted_by: row.submitted_by,
            rating_a_before: row.rating_a_before,
            rating_b_before: row.rating_b_before,
            delta_a: row.delta_a,
            delta_b: row.delta_b,
            created_at: row.created_at,
            resolved_at: row.resolved_at,
        })
    }
}

#[derive(FromRow)]
struct ParticipantRow {
    participant_id: Uuid,
    display_name: String,
    campus: Option<String>,
    is_admin: bool,
    suspended: bool,
    suspended_reason: Option<String>,
    created_at: chrono::NaiveDateTime,
}

#[derive(FromRow)]
struct RatingRow {
    sport: String,
    rating: i32,
}

#[derive(FromRow)]
struct AdjustmentRow {
    adjustment_id: Uuid,
    participant_id: Uuid,
    sport: String,
    old_rating: i32,
    new_rating: i32,
    reason: String,
    admin_id: Uuid,
    created_at: chrono::NaiveDateTime,
}

impl TryFrom<AdjustmentRow> for RatingAdjustment {
    type Error = CoreError;

    fn try_from(row: AdjustmentRow) -> Result<Self> {
        let sport = Sport::from_str(&row.sport).map_err(|_| {
            CoreError::Internal(format!("stored adjustment has sport '{}'", row.sport))
        })?;
        Ok(RatingAdjustment {
            adjustment_id: row.adjustment_id,
            participant_id: row.participant_id,
            sport,
            old_rating: row.old_rating,
            new_rating: row.new_rating,
            reason: row.reason,
            admin_id: row.admin_id,
            created_at: row.created_at,
        })
    }
}

const MATCH_COLUMNS: &str = "match_id, sport, player_a, player_b, score_a, score_b, winner_id, \
     status, submitted_by, rating_a_before, rating_b_before, delta_a, delta_b, \
     created_at, resolved_at";

async fn upsert_rating(
    tx: &mut Transaction<'_, Postgres>,
    participant_id: Uuid,
    sport: Sport,
    rating: i32,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO participant_ratings (participant_id, sport, rating)
        VALUES ($1, $2, $3)
        ON CONFLICT (participant_id, sport)
        DO UPDATE SET rating = EXCLUDED.rating, updated_at = now()
        "#,
    )
    .bind(participant_id)
    .bind(sport.as_str())
    .bind(rating)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Compare-and-set rating write. The row must still hold `expected` (a
/// missing row stands for the default rating), otherwise nothing is
/// written and the caller has to re-read and recompute.
async fn cas_rating(
    tx: &mut Transaction<'_, Postgres>,
    participant_id: Uuid,
    sport: Sport,
    expected: i32,
    rating: i32,
    default_rating: i32,
) -> Result<()> {
    let updated = sqlx::query(
        r#"
        UPDATE participant_ratings
        SET rating = $4, updated_at = now()
        WHERE participant_id = $1 AND sport = $2 AND rating = $3
        "#,
    )
    .bind(participant_id)
    .bind(sport.as_str())
    .bind(expected)
    .bind(rating)
    .execute(&mut **tx)
    .await?
    .rows_affected();
    if updated == 1 {
        return Ok(());
    }

    if expected == default_rating {
        // The insert loses to any row that appeared since the read.
        let inserted = sqlx::query(
            r#"
            INSERT INTO participant_ratings (participant_id, sport, rating)
            VALUES ($1, $2, $3)
            ON CONFLICT (participant_id, sport) DO NOTHING
            "#,
        )
        .bind(participant_id)
        .bind(sport.as_str())
        .bind(rating)
        .execute(&mut **tx)
        .await?
        .rows_affected();
        if inserted == 1 {
            return Ok(());
        }
    }

    Err(CoreError::Conflict(format!(
        "{sport} rating moved while the update was computed"
    )))
}

async fn insert_audit(
    tx: &mut Transaction<'_, Postgres>,
    action: AuditAction,
    target_kind: &str,
    target_id: Uuid,
    detail: serde_json::Value,
    actor_id: Uuid,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_log (action, target_kind, target_id, detail, actor_id)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(action.as_str())
    .bind(target_kind)
    .bind(target_id)
    .bind(detail)
    .bind(actor_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

impl PgMatchStore {
    async fn match_exists(&self, id: Uuid) -> Result<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM matches WHERE match_id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }
}

#[async_trait]
impl MatchStore for PgMatchStore {
    async fn get_participant(&self, id: Uuid) -> Result<Participant> {
        let row = sqlx::query_as::<_, ParticipantRow>(
            r#"
            SELECT participant_id, display_name, campus, is_admin,
                   suspended, suspended_reason, created_at
            FROM participants
            WHERE participant_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(CoreError::NotFound("participant"))?;

        let rating_rows = sqlx::query_as::<_, RatingRow>(
            "SELECT sport, rating FROM participant_ratings WHERE participant_id = $1",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let mut ratings = HashMap::new();
        for r in rating_rows {
            let sport = Sport::from_str(&r.sport)
                .map_err(|_| CoreError::Internal(format!("stored rating has sport '{}'", r.sport)))?;
            ratings.insert(sport, r.rating);
        }

        Ok(Participant {
            participant_id: row.participant_id,
            display_name: row.display_name,
            campus: row.campus,
            is_admin: row.is_admin,
            suspended: row.suspended,
            suspended_reason: row.suspended_reason,
            created_at: row.created_at,
            ratings,
        })
    }

    async fn find_pending(&self, sport: Sport, one: Uuid, other: Uuid) -> Result<Option<Match>> {
        let row = sqlx::query_as::<_, MatchRow>(&format!(
            r#"
            SELECT {MATCH_COLUMNS}
            FROM matches
            WHERE sport = $1
              AND status = 'pending'
              AND LEAST(player_a, player_b) = LEAST($2, $3)
              AND GREATEST(player_a, player_b) = GREATEST($2, $3)
            "#
        ))
        .bind(sport.as_str())
        .bind(one)
        .bind(other)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Match::try_from).transpose()
    }

    async fn insert_match(&self, new: NewMatch) -> Result<Match> {
        let row = sqlx::query_as::<_, MatchRow>(&format!(
            r#"
            INSERT INTO matches (sport, player_a, player_b, score_a, score_b,
                                 winner_id, status, submitted_by)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7)
            RETURNING {MATCH_COLUMNS}
            "#
        ))
        .bind(new.sport.as_str())
        .bind(new.player_a)
        .bind(new.player_b)
        .bind(new.score_a)
        .bind(new.score_b)
        .bind(new.winner_id)
        .bind(new.submitted_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // The partial unique index on pending pairs catches submissions
            // that raced past the lifecycle pre-check.
            let err = CoreError::from(e);
            if err.is_unique_violation() {
                CoreError::Conflict(format!(
                    "a pending {} match already exists for this pair",
                    new.sport
                ))
            } else {
                err
            }
        })?;

        row.try_into()
    }

    async fn get_match(&self, id: Uuid) -> Result<Match> {
        let row = sqlx::query_as::<_, MatchRow>(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE match_id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(CoreError::NotFound("match"))?;

        row.try_into()
    }

    async fn list_for_participant(
        &self,
        id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Match>, i64)> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM matches WHERE player_a = $1 OR player_b = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, MatchRow>(&format!(
            r#"
            SELECT {MATCH_COLUMNS}
            FROM matches
            WHERE player_a = $1 OR player_b = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let matches = rows
            .into_iter()
            .map(Match::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok((matches, total))
    }

    async fn confirm_match(&self, id: Uuid, outcome: ConfirmOutcome) -> Result<Match> {
        let mut tx = self.pool.begin().await?;

        // The status guard makes this a compare-and-set: of two concurrent
        // confirms only one sees a pending row.
        let row = sqlx::query_as::<_, MatchRow>(&format!(
            r#"
            UPDATE matches
            SET status = 'confirmed',
                rating_a_before = $2,
                rating_b_before = $3,
                delta_a = $4,
                delta_b = $5,
                resolved_at = now()
            WHERE match_id = $1 AND status = 'pending'
            RETURNING {MATCH_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(outcome.rating_a_before)
        .bind(outcome.rating_b_before)
        .bind(outcome.delta_a)
        .bind(outcome.delta_b)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            drop(tx);
            return Err(if self.match_exists(id).await? {
                CoreError::Conflict("match is no longer pending".to_string())
            } else {
                CoreError::NotFound("match")
            });
        };
        let m: Match = row.try_into()?;

        // Dropping the transaction on failure also rolls the status flip
        // back, so a rating conflict leaves the match pending.
        cas_rating(
            &mut tx,
            m.player_a,
            m.sport,
            outcome.rating_a_before,
            outcome.rating_a_after(),
            self.default_rating,
        )
        .await?;
        cas_rating(
            &mut tx,
            m.player_b,
            m.sport,
            outcome.rating_b_before,
            outcome.rating_b_after(),
            self.default_rating,
        )
        .await?;

        tx.commit().await?;
        Ok(m)
    }

    async fn close_match(&self, id: Uuid, resolution: Resolution) -> Result<Match> {
        let row = sqlx::query_as::<_, MatchRow>(&format!(
            r#"
            UPDATE matches
            SET status = $2, resolved_at = now()
            WHERE match_id = $1 AND status = 'pending'
            RETURNING {MATCH_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(resolution.status().as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => Err(if self.match_exists(id).await? {
                CoreError::Conflict("match is no longer pending".to_string())
            } else {
                CoreError::NotFound("match")
            }),
        }
    }

    async fn revert_match(&self, id: Uuid, admin_id: Uuid) -> Result<Match> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, MatchRow>(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE match_id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CoreError::NotFound("match"))?;

        let m: Match = row.try_into()?;
        if m.status != MatchStatus::Confirmed {
            return Err(CoreError::Conflict(format!(
                "only confirmed matches can be reverted, match is {}",
                m.status
            )));
        }
        let (Some(rating_a), Some(rating_b)) = (m.rating_a_before, m.rating_b_before) else {
            return Err(CoreError::Internal(
                "confirmed match is missing its rating snapshot".to_string(),
            ));
        };

        upsert_rating(&mut tx, m.player_a, m.sport, rating_a).await?;
        upsert_rating(&mut tx, m.player_b, m.sport, rating_b).await?;

        sqlx::query("DELETE FROM matches WHERE match_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let detail = serde_json::to_value(&m)
            .map_err(|e| CoreError::Internal(format!("failed to serialize match: {e}")))?;
        insert_audit(&mut tx, AuditAction::RevertMatch, "match", id, detail, admin_id).await?;

        tx.commit().await?;
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
        let mut tx = self.pool.begin().await?;

        sqlx::query_scalar::<_, Uuid>(
            "SELECT participant_id FROM participants WHERE participant_id = $1 FOR UPDATE",
        )
        .bind(participant_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CoreError::NotFound("participant"))?;

        let old_rating = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT rating FROM participant_ratings
            WHERE participant_id = $1 AND sport = $2
            FOR UPDATE
            "#,
        )
        .bind(participant_id)
        .bind(sport.as_str())
        .fetch_optional(&mut *tx)
        .await?
        .unwrap_or(self.default_rating);

        upsert_rating(&mut tx, participant_id, sport, new_rating).await?;

        let row = sqlx::query_as::<_, AdjustmentRow>(
            r#"
            INSERT INTO rating_adjustments (participant_id, sport, old_rating,
                                            new_rating, reason, admin_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING adjustment_id, participant_id, sport, old_rating,
                      new_rating, reason, admin_id, created_at
            "#,
        )
        .bind(participant_id)
        .bind(sport.as_str())
        .bind(old_rating)
        .bind(new_rating)
        .bind(&reason)
        .bind(admin_id)
        .fetch_one(&mut *tx)
        .await?;
        let adjustment: RatingAdjustment = row.try_into()?;

        let detail = serde_json::to_value(&adjustment)
            .map_err(|e| CoreError::Internal(format!("failed to serialize adjustment: {e}")))?;
        insert_audit(
            &mut tx,
            AuditAction::AdjustRating,
            "participant",
            participant_id,
            detail,
            admin_id,
        )
        .await?;

        tx.commit().await?;
        Ok(adjustment)
    }

    async fn set_suspended(
        &self,
        participant_id: Uuid,
        suspended: bool,
        reason: Option<String>,
        admin_id: Uuid,
    ) -> Result<Participant> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ParticipantRow>(
            r#"
            UPDATE participants
            SET suspended = $2, suspended_reason = $3
            WHERE participant_id = $1
            RETURNING participant_id, display_name, campus, is_admin,
                      suspended, suspended_reason, created_at
            "#,
        )
        .bind(participant_id)
        .bind(suspended)
        .bind(&reason)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CoreError::NotFound("participant"))?;

        let action = if suspended {
            AuditAction::BanParticipant
        } else {
            AuditAction::UnbanParticipant
        };
        insert_audit(
            &mut tx,
            action,
            "participant",
            participant_id,
            serde_json::json!({ "suspended": suspended, "reason": reason }),
            admin_id,
        )
        .await?;

        tx.commit().await?;

        // Ratings are read after commit; the profile view tolerates that.
        self.get_participant(row.participant_id).await
    }

    async fn leaderboard(&self, sport: Sport) -> Result<Vec<LeaderboardRow>> {
        let rows = sqlx::query_as::<_, LeaderboardRow>(
            r#"
            SELECT p.participant_id,
                   p.display_name,
                   pr.rating,
                   COALESCE(w.wins, 0) AS wins,
                   COALESCE(l.losses, 0) AS losses
            FROM participant_ratings pr
            INNER JOIN participants p ON p.participant_id = pr.participant_id
            LEFT JOIN (
                SELECT winner_id, COUNT(*) AS wins
                FROM matches
                WHERE sport = $1 AND status = 'confirmed'
                GROUP BY winner_id
            ) w ON w.winner_id = p.participant_id
            LEFT JOIN (
                SELECT CASE WHEN winner_id = player_a THEN player_b ELSE player_a END AS loser_id,
                       COUNT(*) AS losses
                FROM matches
                WHERE sport = $1 AND status = 'confirmed'
                GROUP BY 1
            ) l ON l.loser_id = p.participant_id
            WHERE pr.sport = $1
            "#,
        )
        .bind(sport.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
