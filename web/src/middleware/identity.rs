//! Caller identity. The session gateway in front of this service verifies
//! participants against the campus directory and forwards the verified id
//! and admin flag as headers; per the trust boundary we take both as-is.

use axum::{extract::FromRequestParts, http::request::Parts};
use storage::models::Actor;
use uuid::Uuid;

use crate::error::WebError;

pub const PARTICIPANT_HEADER: &str = "x-participant-id";
pub const ADMIN_HEADER: &str = "x-participant-admin";

#[derive(Debug, Clone, Copy)]
pub struct Identity {
    pub participant_id: Uuid,
    pub is_admin: bool,
}

impl Identity {
    pub fn actor(&self) -> Actor {
        Actor {
            participant_id: self.participant_id,
            is_admin: self.is_admin,
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(PARTICIPANT_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(WebError::Unauthorized)?;
        let participant_id = Uuid::parse_str(raw).map_err(|_| {
            WebError::BadRequest(format!("{PARTICIPANT_HEADER} must be a UUID"))
        })?;

        let is_admin = parts
            .headers
            .get(ADMIN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Ok(Self {
            participant_id,
            is_admin,
        })
    }
}
