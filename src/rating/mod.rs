//! Rating Engine
//!
//! ELO math plus the one side effect of writing updated ratings after a
//! completed match.
//!
//! - `elo`: expected score, K-factor, rating update, team averages
//! - `records`: persisted per-game player ratings and team records
//! - `apply`: rating update for a decided match

pub mod apply;
pub mod elo;
pub mod records;

pub use apply::{apply_match_outcome, EloChange, RatingError, RatingOutcome};
pub use elo::{expected_score, k_factor, new_elo, team_average, DEFAULT_ELO, MIN_ELO};
pub use records::{TeamRecord, UserElo};
