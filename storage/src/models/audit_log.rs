use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    AdjustRating,
    RevertMatch,
    BanParticipant,
    UnbanParticipant,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AdjustRating => "adjust_rating",
            Self::RevertMatch => "revert_match",
            Self::BanParticipant => "ban_participant",
            Self::UnbanParticipant => "unban_participant",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "adjust_rating" => Ok(Self::AdjustRating),
            "revert_match" => Ok(Self::RevertMatch),
            "ban_participant" => Ok(Self::BanParticipant),
            "unban_participant" => Ok(Self::UnbanParticipant),
            other => Err(format!("unknown audit action '{other}'")),
        }
    }
}

/// Generic append-only record of an administrative action. Never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub entry_id: Uuid,
    pub action: AuditAction,
    pub target_kind: String,
    pub target_id: Uuid,
    pub detail: serde_json::Value,
    pub actor_id: Uuid,
    pub created_at: chrono::NaiveDateTime,
}
