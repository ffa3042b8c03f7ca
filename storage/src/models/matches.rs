use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::Sport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Confirmed,
    Denied,
    Cancelled,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Denied => "denied",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "denied" => Ok(Self::Denied),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown match status '{other}'")),
        }
    }
}

/// The two ways a pending match can be closed without touching ratings.
/// Confirmation is not representable here: it goes through the rating write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Denied,
    Cancelled,
}

impl Resolution {
    pub fn status(&self) -> MatchStatus {
        match self {
            Self::Denied => MatchStatus::Denied,
            Self::Cancelled => MatchStatus::Cancelled,
        }
    }
}

/// A single head-to-head result. Player order only decides which score
/// belongs to whom; the rules treat the pair as unordered.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Match {
    pub match_id: Uuid,
    pub sport: Sport,
    pub player_a: Uuid,
    pub player_b: Uuid,
    pub score_a: i32,
    pub score_b: i32,
    pub winner_id: Uuid,
    pub status: MatchStatus,
    pub submitted_by: Uuid,
    /// Rating snapshots and applied deltas, stamped by the confirm write.
    pub rating_a_before: Option<i32>,
    pub rating_b_before: Option<i32>,
    pub delta_a: Option<i32>,
    pub delta_b: Option<i32>,
    pub created_at: chrono::NaiveDateTime,
    pub resolved_at: Option<chrono::NaiveDateTime>,
}

impl Match {
    pub fn involves(&self, participant_id: Uuid) -> bool {
        self.player_a == participant_id || self.player_b == participant_id
    }
}
