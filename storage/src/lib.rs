pub mod cache;
pub mod db;
pub mod dto;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

pub use db::Database;
