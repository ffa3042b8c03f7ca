use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Sport;

/// A verified person. Rows are created and kept up to date by the directory
/// sync; this service only reads them and mutates the rating map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub participant_id: Uuid,
    pub display_name: String,
    pub campus: Option<String>,
    pub is_admin: bool,
    pub suspended: bool,
    pub suspended_reason: Option<String>,
    pub created_at: chrono::NaiveDateTime,
    /// Current rating per sport. A sport absent from the map reads as the
    /// configured default.
    #[serde(default)]
    pub ratings: HashMap<Sport, i32>,
}

impl Participant {
    pub fn rating(&self, sport: Sport) -> Option<i32> {
        self.ratings.get(&sport).copied()
    }
}

/// The caller on whose behalf an operation runs. Identity and the admin flag
/// come verified from the session layer; the core trusts both.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub participant_id: Uuid,
    pub is_admin: bool,
}
