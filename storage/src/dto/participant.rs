use std::collections::HashMap;

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Participant;

/// Public profile view of a participant with their per-sport ratings.
#[derive(Debug, Serialize, ToSchema)]
pub struct ParticipantProfile {
    pub participant_id: Uuid,
    pub display_name: String,
    pub campus: Option<String>,
    pub suspended: bool,
    pub created_at: chrono::NaiveDateTime,
    pub ratings: HashMap<String, i32>,
}

impl From<Participant> for ParticipantProfile {
    fn from(p: Participant) -> Self {
        Self {
            participant_id: p.participant_id,
            display_name: p.display_name,
            campus: p.campus,
            suspended: p.suspended,
            created_at: p.created_at,
            ratings: p
                .ratings
                .into_iter()
                .map(|(sport, rating)| (sport.as_str().to_string(), rating))
                .collect(),
        }
    }
}
