pub mod admin;
pub mod leaderboard;
pub mod matches;
pub mod participants;
