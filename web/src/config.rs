use std::fmt::Display;
use std::str::FromStr;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub k_factor: f64,
    pub default_rating: i32,
    pub cache_ttl_secs: u64,
    pub cache_capacity: usize,
    pub cache_sweep_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: std::env::var("HOST").context("Cannot load HOST env variable")?,
            port: std::env::var("PORT")
                .context("Cannot load PORT env variable")?
                .parse()
                .context("PORT must be a number")?,
            database_url: std::env::var("DATABASE_URL")
                .context("Cannot load DATABASE_URL env variable")?,
            k_factor: parse_or("RATING_K_FACTOR", 32.0)?,
            default_rating: parse_or("RATING_DEFAULT", 1000)?,
            cache_ttl_secs: parse_or("LEADERBOARD_CACHE_TTL_SECS", 180)?,
            cache_capacity: parse_or("LEADERBOARD_CACHE_CAPACITY", 16)?,
            cache_sweep_secs: parse_or("LEADERBOARD_CACHE_SWEEP_SECS", 60)?,
        })
    }
}

fn parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{name} is invalid: {e}")),
        Err(_) => Ok(default),
    }
}
