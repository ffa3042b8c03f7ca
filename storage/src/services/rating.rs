//! Pairwise Elo update. Pure arithmetic, no state and no I/O: the lifecycle
//! service feeds in the current rating pair and writes the result through
//! the store in one transaction.

pub const DEFAULT_K: f64 = 32.0;
pub const DEFAULT_RATING: i32 = 1000;

/// Tunables shared by every rating computation in one deployment.
#[derive(Debug, Clone, Copy)]
pub struct RatingSettings {
    pub k_factor: f64,
    pub default_rating: i32,
}

impl Default for RatingSettings {
    fn default() -> Self {
        Self {
            k_factor: DEFAULT_K,
            default_rating: DEFAULT_RATING,
        }
    }
}

/// Both deltas of one confirmation, derived from the same pre-update pair
/// before either side is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingUpdate {
    pub rating_a_before: i32,
    pub rating_b_before: i32,
    pub delta_a: i32,
    pub delta_b: i32,
}

/// Probability of `rating_self` beating `rating_opponent`.
pub fn expected(rating_self: i32, rating_opponent: i32) -> f64 {
    1.0 / (1.0 + 10f64.powf(f64::from(rating_opponent - rating_self) / 400.0))
}

/// Rating change for one side of a result. Each side rounds independently,
/// so the two deltas of a match are not guaranteed to be exact opposites.
pub fn delta(rating_self: i32, rating_opponent: i32, won: bool, k: f64) -> i32 {
    let actual = if won { 1.0 } else { 0.0 };
    (k * (actual - expected(rating_self, rating_opponent))).round() as i32
}

pub fn compute_update(rating_a: i32, rating_b: i32, a_won: bool, k: f64) -> RatingUpdate {
    RatingUpdate {
        rating_a_before: rating_a,
        rating_b_before: rating_b,
        delta_a: delta(rating_a, rating_b, a_won, k),
        delta_b: delta(rating_b, rating_a, !a_won, k),
    }
}
