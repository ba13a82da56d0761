//! Persisted rating rows.

use serde::{Deserialize, Serialize};

use crate::core::ids::{GameId, TeamId, UserId};
use crate::rating::elo::DEFAULT_ELO;

/// A user's rating for one game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserElo {
    /// Rated user.
    pub user_id: UserId,
    /// Game the rating applies to.
    pub game_id: GameId,
    /// Current rating (never below the floor).
    pub elo: i32,
    /// Completed matches counted for K-factor selection.
    pub games_played: u32,
}

impl UserElo {
    /// Fresh row at the default rating.
    pub fn new(user_id: UserId, game_id: GameId) -> Self {
        Self {
            user_id,
            game_id,
            elo: DEFAULT_ELO,
            games_played: 0,
        }
    }
}

/// Aggregate rating and record of a registered team.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRecord {
    /// Team identifier.
    pub team_id: TeamId,
    /// Team rating.
    pub elo: i32,
    /// Matches won.
    pub wins: u32,
    /// Matches lost.
    pub losses: u32,
}

impl TeamRecord {
    /// New team at the default rating.
    pub fn new(team_id: TeamId) -> Self {
        Self {
            team_id,
            elo: DEFAULT_ELO,
            wins: 0,
            losses: 0,
        }
    }

    /// Matches counted for K-factor selection.
    pub fn games_played(&self) -> u32 {
        self.wins + self.losses
    }
}
