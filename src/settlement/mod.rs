//! Settlement Orchestrator
//!
//! Match lifecycle operations. Each one is a single unit of work over the
//! store: status guard, roster checks, ledger movement, rating update and
//! status change commit together or not at all.
//!
//! ## Module Structure
//!
//! - `orchestrator`: create / join / leave / ready / report / refund
//! - `dispute`: dispute filing, evidence, escalation, resolution, deadline sweep
//! - `payout`: pot split and winnings distribution
//! - `error`: operation error taxonomy

pub mod dispute;
pub mod error;
pub mod orchestrator;
pub mod payout;

pub use dispute::{SweepReport, REVIEW_EXPIRED_REASON};
pub use error::MatchError;
pub use orchestrator::{CreateMatch, MatchService, ReadyOutcome, RefundOutcome};
pub use payout::{distribute_winnings, Payout, PayoutError, PayoutPlan};
