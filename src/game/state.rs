//! Match and Roster State
//!
//! Plain data records for matches and their players. Mutation happens only
//! through the settlement orchestrator inside a store unit of work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::ids::{GameId, MatchId, TeamId, UserId};
use crate::game::status::MatchStatus;

// =============================================================================
// TEAM SIDE
// =============================================================================

/// One of the two opposing rosters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Team {
    /// Side A (the creator's side).
    A,
    /// Side B.
    B,
}

impl Team {
    /// The opposing side.
    pub fn opponent(self) -> Team {
        match self {
            Team::A => Team::B,
            Team::B => Team::A,
        }
    }
}

// =============================================================================
// TEAM SIZE
// =============================================================================

/// Roster size per side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TeamSize {
    /// 1v1
    Solo,
    /// 2v2
    Duo,
    /// 3v3
    Trio,
    /// 4v4
    Squad,
    /// 5v5
    Team,
}

impl TeamSize {
    /// Maximum players on one side.
    pub const fn max_per_side(self) -> usize {
        match self {
            TeamSize::Solo => 1,
            TeamSize::Duo => 2,
            TeamSize::Trio => 3,
            TeamSize::Squad => 4,
            TeamSize::Team => 5,
        }
    }

    /// Players needed for both sides to be full.
    pub const fn total_players(self) -> usize {
        self.max_per_side() * 2
    }
}

// =============================================================================
// MATCH
// =============================================================================

/// Final scores reported with a result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scores {
    /// Side A score.
    pub team_a: i32,
    /// Side B score.
    pub team_b: i32,
}

/// A wager match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// Match identifier.
    pub id: MatchId,
    /// Game being played.
    pub game_id: GameId,
    /// Credits staked by each player.
    pub wager: i64,
    /// Roster size per side.
    pub team_size: TeamSize,
    /// Matchmaking region.
    pub region: String,
    /// Platform (console, pc, ...).
    pub platform: String,
    /// Current lifecycle status.
    pub status: MatchStatus,
    /// Winner, set only once COMPLETED.
    pub winning_team: Option<Team>,
    /// Side A score.
    pub team_a_score: Option<i32>,
    /// Side B score.
    pub team_b_score: Option<i32>,
    /// Registered team playing side A.
    pub team_a_id: Option<TeamId>,
    /// Registered team playing side B.
    pub team_b_id: Option<TeamId>,
    /// Creating user.
    pub created_by: UserId,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl Match {
    /// Both sides are registered teams.
    pub fn is_team_match(&self) -> bool {
        self.team_a_id.is_some() && self.team_b_id.is_some()
    }

    /// Registered team for a side.
    pub fn team_id(&self, side: Team) -> Option<TeamId> {
        match side {
            Team::A => self.team_a_id,
            Team::B => self.team_b_id,
        }
    }
}

/// Membership of one user on one side of a match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPlayer {
    /// Match joined.
    pub match_id: MatchId,
    /// Member.
    pub user_id: UserId,
    /// Side (never changes).
    pub team: Team,
    /// Ready check flag.
    pub is_ready: bool,
    /// Join time.
    pub joined_at: DateTime<Utc>,
}

/// Roster helpers over a match's players in join order.
pub trait RosterExt {
    /// Players on one side.
    fn on_side(&self, team: Team) -> Vec<&MatchPlayer>;
    /// Player count on one side.
    fn side_count(&self, team: Team) -> usize;
    /// Membership lookup.
    fn member(&self, user_id: UserId) -> Option<&MatchPlayer>;
    /// Every player ready and both sides at capacity.
    fn ready_to_start(&self, team_size: TeamSize) -> bool;
}

impl RosterExt for [MatchPlayer] {
    fn on_side(&self, team: Team) -> Vec<&MatchPlayer> {
        self.iter().filter(|p| p.team == team).collect()
    }

    fn side_count(&self, team: Team) -> usize {
        self.iter().filter(|p| p.team == team).count()
    }

    fn member(&self, user_id: UserId) -> Option<&MatchPlayer> {
        self.iter().find(|p| p.user_id == user_id)
    }

    fn ready_to_start(&self, team_size: TeamSize) -> bool {
        let full = self.len() == team_size.total_players()
            && self.side_count(Team::A) == team_size.max_per_side();
        full && self.iter().all(|p| p.is_ready)
    }
}
