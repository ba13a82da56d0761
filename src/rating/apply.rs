//! Applying a match outcome to stored ratings.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::core::ids::{TeamId, UserId};
use crate::core::store::Tx;
use crate::game::state::{Match, MatchPlayer, Team};
use crate::rating::elo::{new_elo, team_average};
use crate::rating::records::{TeamRecord, UserElo};

/// Rating update failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RatingError {
    /// A team-vs-team match references a team with no record.
    #[error("no rating record for team {0}")]
    MissingTeam(TeamId),

    /// Nobody on the roster.
    #[error("match has no players to rate")]
    EmptyRoster,
}

/// One rating change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EloChange {
    /// Rated player.
    pub user_id: UserId,
    /// Rating before.
    pub old_elo: i32,
    /// Rating after.
    pub new_elo: i32,
}

/// Everything a completed match changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingOutcome {
    /// Per-player changes in roster order.
    pub players: Vec<EloChange>,
    /// Updated (side A, side B) team ratings for team-vs-team matches.
    pub teams: Option<(i32, i32)>,
}

fn outcome_score(side: Team, winner: Team) -> f64 {
    if side == winner {
        1.0
    } else {
        0.0
    }
}

/// Update per-game player ratings, and team ratings for team-vs-team
/// matches, from a decided result.
///
/// Every player is rated against the opposing side's average rating taken
/// before any update in this call.
pub fn apply_match_outcome(
    tx: &mut Tx<'_>,
    m: &Match,
    players: &[MatchPlayer],
    winning_team: Team,
) -> Result<RatingOutcome, RatingError> {
    if players.is_empty() {
        return Err(RatingError::EmptyRoster);
    }

    let rows: Vec<(Team, UserElo)> = players
        .iter()
        .map(|p| {
            let row = tx
                .user_elo(p.user_id, m.game_id)
                .cloned()
                .unwrap_or_else(|| UserElo::new(p.user_id, m.game_id));
            (p.team, row)
        })
        .collect();

    let side_average = |side: Team| {
        let elos: Vec<i32> = rows
            .iter()
            .filter(|(team, _)| *team == side)
            .map(|(_, row)| row.elo)
            .collect();
        team_average(&elos)
    };
    let average_a = side_average(Team::A);
    let average_b = side_average(Team::B);
    let average_of = |side: Team| match side {
        Team::A => average_a,
        Team::B => average_b,
    };

    let team_record = |side: Team| -> Result<Option<TeamRecord>, RatingError> {
        match m.team_id(side) {
            Some(id) => tx.team(id).cloned().map(Some).ok_or(RatingError::MissingTeam(id)),
            None => Ok(None),
        }
    };
    let teams = if m.is_team_match() {
        team_record(Team::A)?.zip(team_record(Team::B)?)
    } else {
        None
    };

    let mut changes = Vec::with_capacity(rows.len());
    for (team, mut row) in rows {
        let opponent_average = average_of(team.opponent());
        let old_elo = row.elo;
        row.elo = new_elo(
            old_elo,
            opponent_average,
            outcome_score(team, winning_team),
            row.games_played,
        );
        row.games_played += 1;

        changes.push(EloChange {
            user_id: row.user_id,
            old_elo,
            new_elo: row.elo,
        });
        tx.put_user_elo(row);
    }

    let team_elos = teams.map(|(record_a, record_b)| {
        let updated_a = rate_team(&record_a, record_b.elo, Team::A, winning_team);
        let updated_b = rate_team(&record_b, record_a.elo, Team::B, winning_team);
        let elos = (updated_a.elo, updated_b.elo);
        tx.put_team(updated_a);
        tx.put_team(updated_b);
        elos
    });

    debug!(match_id = %m.id, players = changes.len(), "ratings updated");

    Ok(RatingOutcome {
        players: changes,
        teams: team_elos,
    })
}

fn rate_team(record: &TeamRecord, opponent_elo: i32, side: Team, winner: Team) -> TeamRecord {
    let mut updated = record.clone();
    updated.elo = new_elo(
        record.elo,
        opponent_elo,
        outcome_score(side, winner),
        record.games_played(),
    );
    if side == winner {
        updated.wins += 1;
    } else {
        updated.losses += 1;
    }
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::{GameId, MatchId};
    use crate::core::store::Store;
    use crate::game::state::TeamSize;
    use crate::game::status::MatchStatus;
    use chrono::Utc;

    fn test_match(team_ids: Option<(TeamId, TeamId)>) -> Match {
        let now = Utc::now();
        Match {
            id: MatchId::new(),
            game_id: GameId::from_bytes([3; 16]),
            wager: 10,
            team_size: TeamSize::Duo,
            region: "eu".into(),
            platform: "pc".into(),
            status: MatchStatus::InProgress,
            winning_team: None,
            team_a_score: None,
            team_b_score: None,
            team_a_id: team_ids.map(|t| t.0),
            team_b_id: team_ids.map(|t| t.1),
            created_by: UserId::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn roster(m: &Match) -> Vec<MatchPlayer> {
        [Team::A, Team::A, Team::B, Team::B]
            .into_iter()
            .map(|team| MatchPlayer {
                match_id: m.id,
                user_id: UserId::new(),
                team,
                is_ready: true,
                joined_at: Utc::now(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_fresh_players_move_by_provisional_k() {
        let store = Store::new();
        let m = test_match(None);
        let players = roster(&m);

        let outcome = store
            .atomic(|tx| apply_match_outcome(tx, &m, &players, Team::A))
            .await
            .unwrap();

        for change in &outcome.players {
            let team = players.iter().find(|p| p.user_id == change.user_id).unwrap().team;
            let expected = if team == Team::A { 1020 } else { 980 };
            assert_eq!(change.new_elo, expected);
        }
        assert_eq!(outcome.teams, None);

        let row = store
            .read(|t| t.user_elo(players[0].user_id, m.game_id).cloned())
            .await
            .unwrap();
        assert_eq!(row.games_played, 1);
    }

    #[tokio::test]
    async fn test_rated_against_opponent_average() {
        let store = Store::new();
        let m = test_match(None);
        let players = roster(&m);

        store
            .atomic(|tx| {
                let mut strong = UserElo::new(players[2].user_id, m.game_id);
                strong.elo = 1400;
                strong.games_played = 50;
                tx.put_user_elo(strong);
                Ok::<_, RatingError>(())
            })
            .await
            .unwrap();

        let outcome = store
            .atomic(|tx| apply_match_outcome(tx, &m, &players, Team::A))
            .await
            .unwrap();

        // Side B average is 1200; side A players beat the odds.
        let expected_a = new_elo(1000, 1200, 1.0, 0);
        assert_eq!(outcome.players[0].new_elo, expected_a);
        assert_eq!(outcome.players[1].new_elo, expected_a);
        assert_eq!(outcome.players[2].new_elo, new_elo(1400, 1000, 0.0, 50));
    }

    #[tokio::test]
    async fn test_team_records_updated() {
        let store = Store::new();
        let (a, b) = (TeamId::new(), TeamId::new());
        let m = test_match(Some((a, b)));
        let players = roster(&m);

        store
            .atomic(|tx| {
                tx.put_team(TeamRecord::new(a));
                tx.put_team(TeamRecord::new(b));
                Ok::<_, RatingError>(())
            })
            .await
            .unwrap();

        let outcome = store
            .atomic(|tx| apply_match_outcome(tx, &m, &players, Team::B))
            .await
            .unwrap();
        assert_eq!(outcome.teams, Some((980, 1020)));

        let (team_a, team_b) = store
            .read(|t| (t.team(a).cloned().unwrap(), t.team(b).cloned().unwrap()))
            .await;
        assert_eq!((team_a.wins, team_a.losses), (0, 1));
        assert_eq!((team_b.wins, team_b.losses), (1, 0));
    }

    #[tokio::test]
    async fn test_missing_team_fails_without_writes() {
        let store = Store::new();
        let m = test_match(Some((TeamId::new(), TeamId::new())));
        let players = roster(&m);

        let result = store
            .atomic(|tx| apply_match_outcome(tx, &m, &players, Team::A))
            .await;
        assert!(matches!(result, Err(RatingError::MissingTeam(_))));

        let row = store
            .read(|t| t.user_elo(players[0].user_id, m.game_id).cloned())
            .await;
        assert!(row.is_none());
    }
}
