//! Match Notifications
//!
//! Events published after a unit of work commits. Delivery (websocket push,
//! email, ...) lives outside the core and consumes the channel returned by
//! [`Notifier::channel`]. Publishing never blocks and never fails the
//! operation that produced the event.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;

use crate::core::ids::{DisputeId, MatchId, UserId};
use crate::game::state::Team;
use crate::game::status::MatchStatus;

/// Something that happened to a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchEvent {
    /// A user joined a side.
    PlayerJoined {
        /// Match joined.
        match_id: MatchId,
        /// New member.
        user_id: UserId,
        /// Side joined.
        team: Team,
    },

    /// A user left before the start.
    PlayerLeft {
        /// Match left.
        match_id: MatchId,
        /// Former member.
        user_id: UserId,
    },

    /// A ready flag changed.
    ReadyChanged {
        /// Match.
        match_id: MatchId,
        /// Member.
        user_id: UserId,
        /// New flag.
        ready: bool,
    },

    /// Wagers collected and the match began.
    MatchStarted {
        /// Match.
        match_id: MatchId,
        /// Pot held in escrow.
        total_pot: i64,
    },

    /// Winnings paid out.
    MatchCompleted {
        /// Match.
        match_id: MatchId,
        /// Winning side.
        winning_team: Team,
        /// Amount credited to each winner.
        per_winner: i64,
    },

    /// A dispute was filed.
    DisputeFiled {
        /// Match.
        match_id: MatchId,
        /// Dispute.
        dispute_id: DisputeId,
        /// Filing member.
        initiator_id: UserId,
    },

    /// Evidence was attached.
    EvidenceSubmitted {
        /// Match.
        match_id: MatchId,
        /// Submitting member.
        user_id: UserId,
    },

    /// Status moved within the dispute path.
    DisputeEscalated {
        /// Match.
        match_id: MatchId,
        /// New status.
        status: MatchStatus,
    },

    /// Wagers returned.
    MatchRefunded {
        /// Match.
        match_id: MatchId,
        /// Why.
        reason: String,
    },
}

impl MatchEvent {
    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Match the event belongs to.
    pub fn match_id(&self) -> MatchId {
        match self {
            MatchEvent::PlayerJoined { match_id, .. }
            | MatchEvent::PlayerLeft { match_id, .. }
            | MatchEvent::ReadyChanged { match_id, .. }
            | MatchEvent::MatchStarted { match_id, .. }
            | MatchEvent::MatchCompleted { match_id, .. }
            | MatchEvent::DisputeFiled { match_id, .. }
            | MatchEvent::EvidenceSubmitted { match_id, .. }
            | MatchEvent::DisputeEscalated { match_id, .. }
            | MatchEvent::MatchRefunded { match_id, .. } => *match_id,
        }
    }
}

/// An event addressed to a set of users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Users to notify.
    pub recipients: Vec<UserId>,
    /// What happened.
    pub event: MatchEvent,
}

/// Fire-and-forget publisher.
#[derive(Clone, Debug)]
pub struct Notifier {
    tx: Option<mpsc::Sender<Notification>>,
}

impl Notifier {
    /// Create a notifier and the receiving end of its queue.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx: Some(tx) }, rx)
    }

    /// A notifier that drops everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Queue an event for `recipients`.
    pub fn publish(&self, recipients: Vec<UserId>, event: MatchEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        if recipients.is_empty() {
            return;
        }
        if let Err(e) = tx.try_send(Notification { recipients, event }) {
            warn!("Dropped match notification: {}", e);
        }
    }
}
