mod audit_log;
mod matches;
mod participant;
mod rating_adjustment;
mod sport;

pub use audit_log::{AuditAction, AuditLogEntry};
pub use matches::{Match, MatchStatus, Resolution};
pub use participant::{Actor, Participant};
pub use rating_adjustment::RatingAdjustment;
pub use sport::Sport;
