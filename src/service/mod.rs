//! Service Edges
//!
//! Everything around the settlement core that talks to the outside world:
//!
//! - `auth`: JWT validation, caller identity and admin role
//! - `notify`: post-commit match events
//! - `sweeper`: background enforcement of dispute deadlines
//!
//! `MatchService` trusts the `UserId` it is handed. Player operations take the
//! id from [`TokenClaims::user_id`]; the admin operations
//! (`escalate_dispute`, `resolve_dispute`, `refund_match`) carry no caller
//! id, so the transport in front of them must gate each call with
//! [`require_admin`].

pub mod auth;
pub mod notify;
pub mod sweeper;

pub use auth::{require_admin, validate_token, AuthConfig, AuthError, TokenClaims};
pub use notify::{MatchEvent, Notification, Notifier};
pub use sweeper::DeadlineSweeper;
