//! Operation errors.

use thiserror::Error;

use crate::core::ids::{MatchId, UserId};
use crate::game::state::Team;
use crate::game::status::{valid_next_states, MatchStatus, TransitionError};
use crate::ledger::ops::LedgerError;
use crate::settlement::payout::PayoutError;

/// Failure of a match operation. No state is changed when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    // --- validation ----------------------------------------------------------
    /// Malformed input.
    #[error("invalid input: {0}")]
    Validation(String),

    // --- state ---------------------------------------------------------------
    /// Match not accepting players.
    #[error("match is {status}, cannot join (legal next: {legal:?})")]
    NotJoinable {
        /// Current status.
        status: MatchStatus,
        /// Legal next statuses.
        legal: Vec<MatchStatus>,
    },

    /// Roster is locked.
    #[error("match is {status}, cannot leave (legal next: {legal:?})")]
    NotLeavable {
        /// Current status.
        status: MatchStatus,
        /// Legal next statuses.
        legal: Vec<MatchStatus>,
    },

    /// Ready checks are closed.
    #[error("match is {status}, cannot change ready state (legal next: {legal:?})")]
    NotReadyable {
        /// Current status.
        status: MatchStatus,
        /// Legal next statuses.
        legal: Vec<MatchStatus>,
    },

    /// No result can be reported.
    #[error("match is {status}, cannot report a result (legal next: {legal:?})")]
    NotReportable {
        /// Current status.
        status: MatchStatus,
        /// Legal next statuses.
        legal: Vec<MatchStatus>,
    },

    /// Match cannot be disputed.
    #[error("match is {status}, cannot be disputed (legal next: {legal:?})")]
    NotDisputable {
        /// Current status.
        status: MatchStatus,
        /// Legal next statuses.
        legal: Vec<MatchStatus>,
    },

    /// Evidence window not open.
    #[error("match is {status}, not accepting evidence (legal next: {legal:?})")]
    NotInEvidencePhase {
        /// Current status.
        status: MatchStatus,
        /// Legal next statuses.
        legal: Vec<MatchStatus>,
    },

    /// Match already final.
    #[error("match is {status}, cannot be refunded")]
    NotRefundable {
        /// Current status.
        status: MatchStatus,
    },

    /// Admin resolution requested outside admin review.
    #[error("match is {status}, not awaiting admin review (legal next: {legal:?})")]
    NotAwaitingReview {
        /// Current status.
        status: MatchStatus,
        /// Legal next statuses.
        legal: Vec<MatchStatus>,
    },

    /// Requested status change not in the table.
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    // --- authorization -------------------------------------------------------
    /// Caller does not play in this match.
    #[error("user {user_id} is not a member of match {match_id}")]
    NotAMember {
        /// Match.
        match_id: MatchId,
        /// Caller.
        user_id: UserId,
    },

    // --- resources -----------------------------------------------------------
    /// No such match.
    #[error("match not found: {0}")]
    MatchNotFound(MatchId),

    /// Caller already on the roster.
    #[error("user {0} already joined this match")]
    AlreadyMember(UserId),

    /// Side at capacity.
    #[error("team {0:?} is full")]
    TeamFull(Team),

    /// Balance below the wager.
    #[error("insufficient funds for {user_id}: balance {balance}, required {required}")]
    InsufficientFunds {
        /// Short account.
        user_id: UserId,
        /// Balance at check time.
        balance: i64,
        /// Wager.
        required: i64,
    },

    /// Match already has a dispute.
    #[error("dispute already exists for match {0}")]
    DisputeAlreadyExists(MatchId),

    /// Match has no open dispute.
    #[error("no dispute found for match {0}")]
    NoDisputeFound(MatchId),

    // --- settlement ----------------------------------------------------------
    /// Winnings could not be distributed; the match is unchanged.
    #[error("settlement failed for match {match_id}: {source}")]
    SettlementFailed {
        /// Match left in its prior status.
        match_id: MatchId,
        /// Underlying failure.
        #[source]
        source: PayoutError,
    },

    /// Any other ledger failure inside a guarded sequence.
    #[error("ledger error: {0}")]
    Ledger(LedgerError),
}

impl From<LedgerError> for MatchError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds { user_id, balance, required } => {
                MatchError::InsufficientFunds { user_id, balance, required }
            }
            other => MatchError::Ledger(other),
        }
    }
}

pub(crate) fn legal_next(status: MatchStatus) -> Vec<MatchStatus> {
    valid_next_states(status).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_funds_maps_through() {
        let user = UserId::new();
        let err: MatchError = LedgerError::InsufficientFunds { user_id: user, balance: 1, required: 5 }.into();
        assert_eq!(err, MatchError::InsufficientFunds { user_id: user, balance: 1, required: 5 });

        let err: MatchError = LedgerError::InvalidAmount(-1).into();
        assert!(matches!(err, MatchError::Ledger(_)));
    }

    #[test]
    fn test_state_error_lists_legal_states() {
        let err = MatchError::NotReadyable {
            status: MatchStatus::Lobby,
            legal: legal_next(MatchStatus::Lobby),
        };
        assert!(err.to_string().contains("Open"));
    }
}
