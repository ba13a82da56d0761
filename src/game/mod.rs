//! Match Domain Module
//!
//! Data model and state machine for wager matches.
//!
//! ## Module Structure
//!
//! - `status`: Match status enum, transition table, guard predicates
//! - `state`: Match, roster, team sides and sizes
//! - `dispute`: Disputes and evidence

pub mod dispute;
pub mod state;
pub mod status;

// Re-export key types
pub use dispute::{Dispute, Evidence};
pub use state::{Match, MatchPlayer, RosterExt, Scores, Team, TeamSize};
pub use status::{MatchStatus, TransitionError};
