//! Core primitives.
//!
//! Identifier newtypes and the transactional store every operation runs in.

pub mod ids;
pub mod store;

// Re-export core types
pub use ids::{DisputeId, GameId, MatchId, TeamId, TransactionId, UserId};
pub use store::{Store, Tables, Tx};
