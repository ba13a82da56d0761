//! Winnings Distribution
//!
//! ```text
//! total_pot      = wager * player_count
//! platform_fee   = round(total_pot * fee_bps / 10_000)
//! total_winnings = total_pot - platform_fee
//! per_winner     = floor(total_winnings / winner_count)
//! dust           = total_winnings - per_winner * winner_count   (kept by the platform)
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::FeeCollector;
use crate::core::ids::UserId;
use crate::core::store::Tx;
use crate::game::state::{Match, MatchPlayer, RosterExt, Team};
use crate::ledger::entry::{EntryMetadata, TransactionType};
use crate::ledger::ops::{batch_credit, credit, LedgerError};

/// Whole pot, in basis points.
pub const MAX_FEE_BPS: u32 = 10_000;

/// Distribution failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayoutError {
    /// Winning side has no players.
    #[error("winning side has no players")]
    NoWinners,

    /// Fee above 100% of the pot.
    #[error("platform fee of {0} bps exceeds the whole pot")]
    InvalidFee(u32),

    /// Pot arithmetic overflowed.
    #[error("pot overflow")]
    Overflow,

    /// Crediting failed.
    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),
}

/// Pot split for a decided match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutPlan {
    /// Sum of all wagers.
    pub total_pot: i64,
    /// Platform's cut.
    pub platform_fee: i64,
    /// Pot after the fee.
    pub total_winnings: i64,
    /// Credited to each winner.
    pub per_winner: i64,
    /// Remainder of the floor division, not paid to anyone.
    pub dust: i64,
}

impl PayoutPlan {
    /// Split a pot.
    pub fn compute(
        wager: i64,
        player_count: usize,
        winner_count: usize,
        fee_bps: u32,
    ) -> Result<Self, PayoutError> {
        if winner_count == 0 {
            return Err(PayoutError::NoWinners);
        }
        if fee_bps > MAX_FEE_BPS {
            return Err(PayoutError::InvalidFee(fee_bps));
        }

        let total_pot = wager
            .checked_mul(player_count as i64)
            .ok_or(PayoutError::Overflow)?;
        // Round half up, as the pot is never negative.
        let platform_fee = ((i128::from(total_pot) * i128::from(fee_bps) + 5_000) / 10_000) as i64;
        let total_winnings = total_pot - platform_fee;
        let per_winner = total_winnings / winner_count as i64;
        let dust = total_winnings - per_winner * winner_count as i64;

        Ok(Self {
            total_pot,
            platform_fee,
            total_winnings,
            per_winner,
            dust,
        })
    }
}

/// Credits written for a decided match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    /// The split applied.
    pub plan: PayoutPlan,
    /// Winning side.
    pub winning_team: Team,
    /// Winners credited, in join order.
    pub winners: Vec<UserId>,
    /// Account that received the platform fee entry.
    pub fee_collector: UserId,
}

/// Credit winners and record the platform fee inside `tx`.
pub fn distribute_winnings(
    tx: &mut Tx<'_>,
    m: &Match,
    players: &[MatchPlayer],
    winning_team: Team,
    fee_bps: u32,
    collector: FeeCollector,
) -> Result<Payout, PayoutError> {
    let winners: Vec<UserId> = players
        .on_side(winning_team)
        .into_iter()
        .map(|p| p.user_id)
        .collect();

    let plan = PayoutPlan::compute(m.wager, players.len(), winners.len(), fee_bps)?;

    let win_meta = EntryMetadata::Win {
        match_id: m.id,
        winning_team,
        total_pot: plan.total_pot,
    };
    batch_credit(tx, &winners, plan.per_winner, TransactionType::MatchWin, &win_meta)?;

    let fee_collector = match collector {
        FeeCollector::Treasury(id) => id,
        FeeCollector::FirstWinner => winners[0],
    };
    credit(
        tx,
        fee_collector,
        plan.platform_fee,
        TransactionType::PlatformFee,
        EntryMetadata::PlatformFee {
            match_id: m.id,
            total_pot: plan.total_pot,
            fee: plan.platform_fee,
        },
    )?;

    Ok(Payout {
        plan,
        winning_team,
        winners,
        fee_collector,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_split() {
        let plan = PayoutPlan::compute(100, 4, 2, 1000).unwrap();
        assert_eq!(plan.total_pot, 400);
        assert_eq!(plan.platform_fee, 40);
        assert_eq!(plan.total_winnings, 360);
        assert_eq!(plan.per_winner, 180);
        assert_eq!(plan.dust, 0);
        assert_eq!(plan.per_winner * 2 + plan.platform_fee, plan.total_pot);
    }

    #[test]
    fn test_floor_remainder_is_dropped() {
        // pot 30, fee 3, winnings 27 split three ways is exact; split two ways leaves 1.
        let plan = PayoutPlan::compute(15, 2, 2, 1000).unwrap();
        assert_eq!(plan.platform_fee, 3);
        assert_eq!(plan.per_winner, 13);
        assert_eq!(plan.dust, 1);
        assert_eq!(plan.per_winner * 2 + plan.platform_fee + plan.dust, plan.total_pot);
    }

    #[test]
    fn test_fee_rounds_half_up() {
        // pot 25 * 10% = 2.5 -> 3
        let plan = PayoutPlan::compute(25, 1, 1, 1000).unwrap();
        assert_eq!(plan.platform_fee, 3);
        // pot 14 * 10% = 1.4 -> 1
        let plan = PayoutPlan::compute(7, 2, 1, 1000).unwrap();
        assert_eq!(plan.platform_fee, 1);
    }

    #[test]
    fn test_zero_wager() {
        let plan = PayoutPlan::compute(0, 2, 1, 1000).unwrap();
        assert_eq!(plan.total_pot, 0);
        assert_eq!(plan.per_winner, 0);
    }

    #[test]
    fn test_no_winners_rejected() {
        assert_eq!(PayoutPlan::compute(10, 2, 0, 1000), Err(PayoutError::NoWinners));
    }

    #[test]
    fn test_fee_above_whole_pot_rejected() {
        assert_eq!(PayoutPlan::compute(50, 2, 1, 15_000), Err(PayoutError::InvalidFee(15_000)));

        let plan = PayoutPlan::compute(50, 2, 1, MAX_FEE_BPS).unwrap();
        assert_eq!(plan.platform_fee, 100);
        assert_eq!(plan.per_winner, 0);
    }

    #[test]
    fn test_overflow_rejected() {
        assert_eq!(PayoutPlan::compute(i64::MAX, 2, 1, 1000), Err(PayoutError::Overflow));
    }
}
