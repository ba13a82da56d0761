//! Engine Configuration
//!
//! Settlement parameters with defaults matching production and overrides
//! read from environment variables.

use std::time::Duration as StdDuration;

use chrono::Duration;
use tracing::warn;

use crate::core::ids::UserId;
use crate::settlement::payout::MAX_FEE_BPS;

/// Default treasury account (nil UUID).
pub const TREASURY_USER_ID: UserId = UserId::from_bytes([0; 16]);

/// Who receives the platform fee entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeeCollector {
    /// A dedicated treasury account.
    Treasury(UserId),
    /// The first winning player in join order (legacy ledger parity).
    FirstWinner,
}

/// Settlement engine configuration.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Platform fee in basis points of the total pot.
    pub platform_fee_bps: u32,
    /// Length of the dispute evidence window.
    pub dispute_window: Duration,
    /// Time after the deadline before an unreviewed dispute is refunded.
    pub admin_review_grace: Duration,
    /// Platform fee recipient.
    pub fee_collector: FeeCollector,
    /// Capacity of the notification channel.
    pub notify_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            platform_fee_bps: 1000, // 10%
            dispute_window: Duration::hours(48),
            admin_review_grace: Duration::hours(72),
            fee_collector: FeeCollector::Treasury(TREASURY_USER_ID),
            notify_capacity: 256,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Fees above the whole pot fall back to the default.
fn checked_fee_bps(bps: u32) -> u32 {
    if bps > MAX_FEE_BPS {
        let fallback = EngineConfig::default().platform_fee_bps;
        warn!(bps, fallback, "ARENA_PLATFORM_FEE_BPS exceeds {}, using default", MAX_FEE_BPS);
        return fallback;
    }
    bps
}

impl EngineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let fee_collector = if std::env::var("ARENA_FEE_TO_FIRST_WINNER")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false)
        {
            FeeCollector::FirstWinner
        } else {
            let treasury = std::env::var("ARENA_TREASURY_ID")
                .ok()
                .and_then(|v| UserId::from_uuid_str(&v))
                .unwrap_or(TREASURY_USER_ID);
            FeeCollector::Treasury(treasury)
        };

        Self {
            platform_fee_bps: env_parse("ARENA_PLATFORM_FEE_BPS")
                .map(checked_fee_bps)
                .unwrap_or(defaults.platform_fee_bps),
            dispute_window: env_parse("ARENA_DISPUTE_WINDOW_HOURS")
                .map(Duration::hours)
                .unwrap_or(defaults.dispute_window),
            admin_review_grace: env_parse("ARENA_ADMIN_REVIEW_GRACE_HOURS")
                .map(Duration::hours)
                .unwrap_or(defaults.admin_review_grace),
            fee_collector,
            notify_capacity: env_parse("ARENA_NOTIFY_CAPACITY")
                .unwrap_or(defaults.notify_capacity),
        }
    }
}

/// Dispute deadline sweeper configuration.
#[derive(Clone, Debug)]
pub struct SweeperConfig {
    /// Time between sweeps.
    pub interval: StdDuration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: StdDuration::from_secs(60),
        }
    }
}

impl SweeperConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            interval: env_parse("ARENA_SWEEP_INTERVAL_SECS")
                .map(StdDuration::from_secs)
                .unwrap_or_else(|| Self::default().interval),
        }
    }
}
