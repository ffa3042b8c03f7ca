pub mod admin;
pub mod leaderboard;
pub mod lifecycle;
pub mod rating;
