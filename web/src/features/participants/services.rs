use storage::dto::participant::ParticipantProfile;
use storage::error::Result;
use uuid::Uuid;

use crate::state::AppState;

pub async fn get_profile(state: &AppState, id: Uuid) -> Result<ParticipantProfile> {
    let participant = state.store.get_participant(id).await?;
    Ok(ParticipantProfile::from(participant))
}
