//! Disputes and Evidence

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::core::ids::{DisputeId, MatchId, UserId};

/// A piece of evidence attached to a dispute.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// Submitting member.
    pub user_id: UserId,
    /// Link to a clip or screenshot.
    pub link: String,
    /// Free-form explanation.
    pub message: String,
    /// Submission time.
    pub created_at: DateTime<Utc>,
}

/// The single active contest of a match outcome.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    /// Dispute identifier.
    pub id: DisputeId,
    /// Contested match.
    pub match_id: MatchId,
    /// Member who filed it.
    pub initiator_id: UserId,
    /// Reason given at filing.
    pub reason: String,
    /// Filing time.
    pub created_at: DateTime<Utc>,
    /// End of the evidence window.
    pub deadline: DateTime<Utc>,
    /// Evidence in submission order.
    pub evidence: Vec<Evidence>,
    /// Set once the match reaches COMPLETED or REFUNDED.
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Dispute {
    /// Open a dispute whose evidence window closes after `window`.
    pub fn open(
        match_id: MatchId,
        initiator_id: UserId,
        reason: String,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Self {
        Self {
            id: DisputeId::new(),
            match_id,
            initiator_id,
            reason,
            created_at: now,
            deadline: now + window,
            evidence: Vec::new(),
            resolved_at: None,
        }
    }

    /// The evidence window has closed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline
    }

    /// The dispute no longer blocks the match.
    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }
}
