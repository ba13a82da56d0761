//! Match Status State Machine
//!
//! The fixed transition table every match status change goes through, plus
//! the guard predicates the orchestrator checks before attempting an
//! operation. Guards are pure functions of the current status.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Lifecycle status of a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    /// Created, only the creator's side has players.
    Lobby,
    /// Accepting players and ready checks.
    Open,
    /// Wagers collected, match being played.
    InProgress,
    /// Result recorded and winnings paid out.
    Completed,
    /// Outcome contested by a participant.
    Disputed,
    /// Waiting for the other side to submit evidence.
    AwaitingOpponentEvidence,
    /// Waiting for an administrator decision.
    AwaitingAdminReview,
    /// Wagers returned, match void.
    Refunded,
}

impl MatchStatus {
    /// Every status, in declaration order.
    pub const ALL: [MatchStatus; 8] = [
        MatchStatus::Lobby,
        MatchStatus::Open,
        MatchStatus::InProgress,
        MatchStatus::Completed,
        MatchStatus::Disputed,
        MatchStatus::AwaitingOpponentEvidence,
        MatchStatus::AwaitingAdminReview,
        MatchStatus::Refunded,
    ];

    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Lobby => "LOBBY",
            MatchStatus::Open => "OPEN",
            MatchStatus::InProgress => "IN_PROGRESS",
            MatchStatus::Completed => "COMPLETED",
            MatchStatus::Disputed => "DISPUTED",
            MatchStatus::AwaitingOpponentEvidence => "AWAITING_OPPONENT_EVIDENCE",
            MatchStatus::AwaitingAdminReview => "AWAITING_ADMIN_REVIEW",
            MatchStatus::Refunded => "REFUNDED",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected status change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal transition {from} -> {to} (legal: {legal:?})")]
pub struct TransitionError {
    /// Status the match was in.
    pub from: MatchStatus,
    /// Status that was requested.
    pub to: MatchStatus,
    /// Statuses reachable from `from`.
    pub legal: Vec<MatchStatus>,
}

/// Legal next states for a status.
pub fn valid_next_states(from: MatchStatus) -> &'static [MatchStatus] {
    use MatchStatus::*;
    match from {
        Lobby => &[Open, Refunded],
        Open => &[Lobby, InProgress, Refunded],
        InProgress => &[Completed, Disputed, Refunded],
        Disputed => &[AwaitingOpponentEvidence, AwaitingAdminReview, Refunded],
        AwaitingOpponentEvidence => &[AwaitingAdminReview, Refunded],
        AwaitingAdminReview => &[Completed, Refunded],
        Completed | Refunded => &[],
    }
}

/// Whether `from -> to` is in the transition table.
pub fn is_valid_transition(from: MatchStatus, to: MatchStatus) -> bool {
    valid_next_states(from).contains(&to)
}

/// Attempt a transition, returning the new status or a typed rejection.
pub fn transition(from: MatchStatus, to: MatchStatus) -> Result<MatchStatus, TransitionError> {
    if is_valid_transition(from, to) {
        Ok(to)
    } else {
        Err(TransitionError {
            from,
            to,
            legal: valid_next_states(from).to_vec(),
        })
    }
}

// =============================================================================
// GUARDS
// =============================================================================

/// Players may join.
pub fn can_join(status: MatchStatus) -> bool {
    matches!(status, MatchStatus::Lobby | MatchStatus::Open)
}

/// Players may leave (roster churn before start).
pub fn can_leave(status: MatchStatus) -> bool {
    matches!(status, MatchStatus::Lobby | MatchStatus::Open)
}

/// Ready flags may change.
pub fn can_ready(status: MatchStatus) -> bool {
    status == MatchStatus::Open
}

/// A result may be reported.
pub fn can_report_result(status: MatchStatus) -> bool {
    status == MatchStatus::InProgress
}

/// A dispute may be filed. COMPLETED is terminal, so paid-out matches
/// cannot be disputed.
pub fn can_dispute(status: MatchStatus) -> bool {
    status == MatchStatus::InProgress
}

/// Evidence may be attached to the open dispute.
pub fn can_submit_evidence(status: MatchStatus) -> bool {
    matches!(
        status,
        MatchStatus::Disputed
            | MatchStatus::AwaitingOpponentEvidence
            | MatchStatus::AwaitingAdminReview
    )
}

/// No further transitions are possible.
pub fn is_final_state(status: MatchStatus) -> bool {
    matches!(status, MatchStatus::Completed | MatchStatus::Refunded)
}

/// Administrative refund is allowed.
pub fn can_refund(status: MatchStatus) -> bool {
    !is_final_state(status)
}

/// The match is blocked on an administrator.
pub fn requires_admin_action(status: MatchStatus) -> bool {
    status == MatchStatus::AwaitingAdminReview
}

/// Player wagers are currently held in escrow.
pub fn wagers_held(status: MatchStatus) -> bool {
    matches!(
        status,
        MatchStatus::InProgress
            | MatchStatus::Disputed
            | MatchStatus::AwaitingOpponentEvidence
            | MatchStatus::AwaitingAdminReview
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use MatchStatus::*;

    const TABLE: [(MatchStatus, MatchStatus); 15] = [
        (Lobby, Open),
        (Open, Lobby),
        (Open, InProgress),
        (InProgress, Completed),
        (InProgress, Disputed),
        (Lobby, Refunded),
        (Open, Refunded),
        (InProgress, Refunded),
        (Disputed, Refunded),
        (AwaitingOpponentEvidence, Refunded),
        (AwaitingAdminReview, Refunded),
        (Disputed, AwaitingOpponentEvidence),
        (Disputed, AwaitingAdminReview),
        (AwaitingOpponentEvidence, AwaitingAdminReview),
        (AwaitingAdminReview, Completed),
    ];

    #[test]
    fn test_exhaustive_transition_table() {
        let mut valid = 0;
        for from in MatchStatus::ALL {
            for to in MatchStatus::ALL {
                let expected = TABLE.contains(&(from, to));
                assert_eq!(
                    is_valid_transition(from, to),
                    expected,
                    "{} -> {}",
                    from,
                    to
                );
                if expected {
                    valid += 1;
                }
            }
        }
        assert_eq!(valid, TABLE.len());
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for to in MatchStatus::ALL {
            assert!(transition(Completed, to).is_err());
            assert!(transition(Refunded, to).is_err());
        }
        assert!(valid_next_states(Completed).is_empty());
        assert!(valid_next_states(Refunded).is_empty());
    }

    #[test]
    fn test_rejection_reports_legal_states() {
        let err = transition(Lobby, Completed).unwrap_err();
        assert_eq!(err.from, Lobby);
        assert_eq!(err.to, Completed);
        assert_eq!(err.legal, vec![Open, Refunded]);
    }

    #[test]
    fn test_self_transitions_rejected() {
        for s in MatchStatus::ALL {
            assert!(!is_valid_transition(s, s));
        }
    }

    #[test]
    fn test_guards_match_transition_origins() {
        for s in MatchStatus::ALL {
            if can_join(s) {
                assert!(!is_final_state(s));
            }
            if can_leave(s) {
                assert!(s == Lobby || is_valid_transition(s, Lobby));
            }
            if can_ready(s) {
                assert!(is_valid_transition(s, InProgress));
            }
            if can_report_result(s) {
                assert!(is_valid_transition(s, Completed));
            }
            if can_dispute(s) {
                assert!(is_valid_transition(s, Disputed));
            }
            if can_refund(s) {
                assert!(is_valid_transition(s, Refunded));
            }
            if requires_admin_action(s) {
                assert!(is_valid_transition(s, Completed));
                assert!(is_valid_transition(s, Refunded));
            }
            if can_submit_evidence(s) {
                assert!(!is_final_state(s));
            }
            assert_eq!(is_final_state(s), valid_next_states(s).is_empty());
        }
    }

    #[test]
    fn test_wagers_held_only_after_start() {
        assert!(!wagers_held(Lobby));
        assert!(!wagers_held(Open));
        assert!(wagers_held(InProgress));
        assert!(wagers_held(AwaitingAdminReview));
        assert!(!wagers_held(Completed));
        assert!(!wagers_held(Refunded));
    }

    #[test]
    fn test_status_serializes_screaming_snake() {
        let json = serde_json::to_string(&AwaitingOpponentEvidence).unwrap();
        assert_eq!(json, "\"AWAITING_OPPONENT_EVIDENCE\"");
        assert_eq!(AwaitingOpponentEvidence.to_string(), "AWAITING_OPPONENT_EVIDENCE");
    }
}
