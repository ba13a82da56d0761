//! Ledger Entries
//!
//! Immutable records of single credit movements. Metadata is a tagged union
//! so each entry carries only the fields relevant to its purpose.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::ids::{MatchId, TransactionId, UserId};
use crate::game::state::Team;

/// Kind of credit movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Stake taken when a match starts.
    WagerDebit,
    /// Winnings paid to a winner.
    MatchWin,
    /// Loss record (informational).
    MatchLoss,
    /// Platform's cut of the pot.
    PlatformFee,
    /// Stake returned.
    Refund,
    /// External top-up.
    Deposit,
    /// External cash-out.
    Withdrawal,
}

/// Settlement status of an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// Applied to the balance.
    Completed,
}

/// Purpose-specific entry metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryMetadata {
    /// Stake for a match.
    Wager {
        /// Match the stake was taken for.
        match_id: MatchId,
    },
    /// Winnings from a match.
    Win {
        /// Settled match.
        match_id: MatchId,
        /// Winning side.
        winning_team: Team,
        /// Total pot before fees.
        total_pot: i64,
    },
    /// Loss in a match.
    Loss {
        /// Settled match.
        match_id: MatchId,
        /// Winning side.
        winning_team: Team,
    },
    /// Platform fee taken from a pot.
    PlatformFee {
        /// Settled match.
        match_id: MatchId,
        /// Total pot before fees.
        total_pot: i64,
        /// Fee amount.
        fee: i64,
    },
    /// Stake returned.
    Refund {
        /// Refunded match.
        match_id: MatchId,
        /// Why it was refunded.
        reason: String,
    },
    /// External deposit.
    Deposit {
        /// Payment reference.
        reference: String,
    },
    /// External withdrawal.
    Withdrawal {
        /// Payout reference.
        reference: String,
    },
}

impl EntryMetadata {
    /// Match this entry refers to, if any.
    pub fn match_id(&self) -> Option<MatchId> {
        match self {
            EntryMetadata::Wager { match_id }
            | EntryMetadata::Win { match_id, .. }
            | EntryMetadata::Loss { match_id, .. }
            | EntryMetadata::PlatformFee { match_id, .. }
            | EntryMetadata::Refund { match_id, .. } => Some(*match_id),
            EntryMetadata::Deposit { .. } | EntryMetadata::Withdrawal { .. } => None,
        }
    }
}

/// One immutable credit movement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Entry identifier.
    pub id: TransactionId,
    /// Account moved.
    pub user_id: UserId,
    /// Kind of movement.
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    /// Signed amount: debits negative, credits positive.
    pub amount: i64,
    /// Settlement status.
    pub status: TransactionStatus,
    /// Purpose-specific details.
    pub metadata: EntryMetadata,
    /// Write time.
    pub created_at: DateTime<Utc>,
}
