//! Identifiers
//!
//! Strongly-typed UUID newtypes so a `UserId` can never be passed where a
//! `MatchId` is expected. All ids implement `Ord` for deterministic
//! `BTreeMap` ordering inside the store.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create from raw bytes.
            pub const fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(Uuid::from_bytes(bytes))
            }

            /// Parse from a UUID string.
            pub fn from_uuid_str(s: &str) -> Option<Self> {
                Uuid::parse_str(s).ok().map(Self)
            }

            /// Get raw bytes.
            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

define_id!(
    /// Platform user (player, admin, or the treasury account).
    UserId
);
define_id!(
    /// A wager match.
    MatchId
);
define_id!(
    /// A game title; ratings are tracked per game.
    GameId
);
define_id!(
    /// A registered team (team-vs-team matches only).
    TeamId
);
define_id!(
    /// A dispute filed against a match.
    DisputeId
);
define_id!(
    /// A single ledger entry.
    TransactionId
);
