//! Transactional Store
//!
//! In-process stand-in for the relational store. Every read-guard-write
//! sequence runs as one unit of work through [`Store::atomic`]:
//!
//! - units are serialized by a single async mutex (serializable isolation),
//! - a unit works on a private copy of the tables,
//! - the copy replaces the committed tables only if the unit returns `Ok`.
//!
//! A unit that returns `Err`, panics, or whose future is dropped before
//! completion leaves the committed tables untouched.
//!
//! Each unit and each savepoint clones every table, ledger entries included,
//! so a unit costs O(total entries). A relational backend replaces this with
//! real transactions.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use crate::core::ids::{GameId, MatchId, TeamId, UserId};
use crate::game::dispute::Dispute;
use crate::game::state::{Match, MatchPlayer};
use crate::ledger::entry::LedgerEntry;
use crate::rating::records::{TeamRecord, UserElo};

/// All tables.
#[derive(Clone, Debug, Default)]
pub struct Tables {
    balances: BTreeMap<UserId, i64>,
    entries: Vec<LedgerEntry>,
    matches: BTreeMap<MatchId, Match>,
    /// Players per match, in join order.
    players: BTreeMap<MatchId, Vec<MatchPlayer>>,
    disputes: BTreeMap<MatchId, Dispute>,
    user_elos: BTreeMap<(UserId, GameId), UserElo>,
    teams: BTreeMap<TeamId, TeamRecord>,
}

/// Shared transactional store.
#[derive(Debug, Default)]
pub struct Store {
    tables: Mutex<Tables>,
}

impl Store {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` as one atomic unit stamped with the current time.
    pub async fn atomic<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Tx<'_>) -> Result<T, E>,
    {
        self.atomic_at(Utc::now(), f).await
    }

    /// Run `f` as one atomic unit stamped with `now`.
    pub async fn atomic_at<T, E, F>(&self, now: DateTime<Utc>, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Tx<'_>) -> Result<T, E>,
    {
        let mut committed = self.tables.lock().await;
        let mut working = committed.clone();

        let result = f(&mut Tx { tables: &mut working, now });

        if result.is_ok() {
            *committed = working;
            #[cfg(feature = "debug-tracing")]
            tracing::trace!("unit of work committed");
        } else {
            #[cfg(feature = "debug-tracing")]
            tracing::trace!("unit of work rolled back");
        }

        result
    }

    /// Read-only access to the committed tables.
    pub async fn read<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&Tables) -> T,
    {
        let committed = self.tables.lock().await;
        f(&committed)
    }
}

/// An open unit of work.
pub struct Tx<'a> {
    tables: &'a mut Tables,
    now: DateTime<Utc>,
}

impl<'a> Tx<'a> {
    /// Timestamp shared by every write in this unit.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Run `f` against a savepoint. Its writes are kept only if it succeeds;
    /// on error the unit continues from the state before the savepoint.
    pub fn savepoint<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Tx<'_>) -> Result<T, E>,
    {
        let mut working = self.tables.clone();
        let result = f(&mut Tx { tables: &mut working, now: self.now });
        if result.is_ok() {
            *self.tables = working;
        }
        result
    }

    // --- accounts & ledger ---------------------------------------------------

    /// Cached balance, if the account exists.
    pub fn balance(&self, user_id: UserId) -> Option<i64> {
        self.tables.balances.get(&user_id).copied()
    }

    pub(crate) fn set_balance(&mut self, user_id: UserId, balance: i64) {
        self.tables.balances.insert(user_id, balance);
    }

    pub(crate) fn append_entry(&mut self, entry: LedgerEntry) {
        self.tables.entries.push(entry);
    }

    /// Ledger entries in write order.
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.tables.entries
    }

    // --- matches -------------------------------------------------------------

    /// Look up a match.
    pub fn get_match(&self, match_id: MatchId) -> Option<&Match> {
        self.tables.matches.get(&match_id)
    }

    /// Insert or replace a match row.
    pub(crate) fn put_match(&mut self, m: Match) {
        self.tables.matches.insert(m.id, m);
    }

    /// Players of a match in join order.
    pub fn players(&self, match_id: MatchId) -> &[MatchPlayer] {
        self.tables
            .players
            .get(&match_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub(crate) fn add_player(&mut self, player: MatchPlayer) {
        self.tables.players.entry(player.match_id).or_default().push(player);
    }

    pub(crate) fn remove_player(&mut self, match_id: MatchId, user_id: UserId) -> bool {
        match self.tables.players.get_mut(&match_id) {
            Some(roster) => {
                let before = roster.len();
                roster.retain(|p| p.user_id != user_id);
                roster.len() != before
            }
            None => false,
        }
    }

    pub(crate) fn player_mut(&mut self, match_id: MatchId, user_id: UserId) -> Option<&mut MatchPlayer> {
        self.tables
            .players
            .get_mut(&match_id)?
            .iter_mut()
            .find(|p| p.user_id == user_id)
    }

    // --- disputes ------------------------------------------------------------

    /// Dispute filed against a match.
    pub fn dispute(&self, match_id: MatchId) -> Option<&Dispute> {
        self.tables.disputes.get(&match_id)
    }

    pub(crate) fn dispute_mut(&mut self, match_id: MatchId) -> Option<&mut Dispute> {
        self.tables.disputes.get_mut(&match_id)
    }

    pub(crate) fn put_dispute(&mut self, dispute: Dispute) {
        self.tables.disputes.insert(dispute.match_id, dispute);
    }

    // --- ratings -------------------------------------------------------------

    /// Rating row for (user, game).
    pub fn user_elo(&self, user_id: UserId, game_id: GameId) -> Option<&UserElo> {
        self.tables.user_elos.get(&(user_id, game_id))
    }

    pub(crate) fn put_user_elo(&mut self, row: UserElo) {
        self.tables.user_elos.insert((row.user_id, row.game_id), row);
    }

    /// Team record.
    pub fn team(&self, team_id: TeamId) -> Option<&TeamRecord> {
        self.tables.teams.get(&team_id)
    }

    /// Insert or replace a team record (team CRUD lives outside the core).
    pub fn put_team(&mut self, team: TeamRecord) {
        self.tables.teams.insert(team.team_id, team);
    }
}

impl Tables {
    /// Cached balance.
    pub fn balance(&self, user_id: UserId) -> Option<i64> {
        self.balances.get(&user_id).copied()
    }

    /// Every ledger entry in write order.
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Look up a match.
    pub fn get_match(&self, match_id: MatchId) -> Option<&Match> {
        self.matches.get(&match_id)
    }

    /// Players of a match in join order.
    pub fn players(&self, match_id: MatchId) -> &[MatchPlayer] {
        self.players.get(&match_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Dispute filed against a match.
    pub fn dispute(&self, match_id: MatchId) -> Option<&Dispute> {
        self.disputes.get(&match_id)
    }

    /// Every dispute, resolved or not.
    pub fn disputes(&self) -> impl Iterator<Item = &Dispute> + '_ {
        self.disputes.values()
    }

    /// Rating row for (user, game).
    pub fn user_elo(&self, user_id: UserId, game_id: GameId) -> Option<&UserElo> {
        self.user_elos.get(&(user_id, game_id))
    }

    /// Team record.
    pub fn team(&self, team_id: TeamId) -> Option<&TeamRecord> {
        self.teams.get(&team_id)
    }
}
