//! # Wager Arena
//!
//! Settlement core for competitive wager matches: players stake credits on a
//! match, the winners split the pot minus a platform fee, ratings move, and
//! contested results go through a dispute workflow.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        WAGER ARENA                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Primitives                                │
//! │  ├── ids.rs      - UUID newtypes                             │
//! │  └── store.rs    - Transactional tables (units of work)      │
//! │                                                              │
//! │  game/           - Match domain                              │
//! │  ├── status.rs   - Status enum, transition table, guards     │
//! │  ├── state.rs    - Match, roster, sides                      │
//! │  └── dispute.rs  - Disputes and evidence                     │
//! │                                                              │
//! │  ledger/         - Credit ledger                             │
//! │  ├── entry.rs    - Append-only entries                       │
//! │  └── ops.rs      - Guarded debit / credit / batches          │
//! │                                                              │
//! │  rating/         - ELO                                       │
//! │                                                              │
//! │  settlement/     - Orchestrator                              │
//! │  ├── orchestrator.rs - Lifecycle operations                  │
//! │  ├── dispute.rs  - Dispute workflow, deadline sweep          │
//! │  └── payout.rs   - Pot split                                 │
//! │                                                              │
//! │  service/        - Edges                                     │
//! │  ├── auth.rs     - JWT caller identity                       │
//! │  ├── notify.rs   - Post-commit events                        │
//! │  └── sweeper.rs  - Background deadline enforcement           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Money Invariants
//!
//! - A balance never goes negative; every debit is guarded.
//! - Every balance change has exactly one ledger entry, and a balance always
//!   equals the signed sum of its entries.
//! - An operation either commits all of its ledger, rating and status writes
//!   or none of them.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod game;
pub mod ledger;
pub mod rating;
pub mod service;
pub mod settlement;

// Re-export commonly used types
pub use config::{EngineConfig, FeeCollector, SweeperConfig, TREASURY_USER_ID};
pub use core::ids::{DisputeId, GameId, MatchId, TeamId, TransactionId, UserId};
pub use core::store::Store;
pub use game::state::{Match, MatchPlayer, Scores, Team, TeamSize};
pub use game::status::MatchStatus;
pub use ledger::{Ledger, LedgerError};
pub use settlement::{CreateMatch, MatchError, MatchService, Payout, PayoutPlan, SweepReport};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
