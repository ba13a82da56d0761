//! Match Orchestrator
//!
//! Runs every match operation as a single unit of work: load, guard, mutate,
//! and (when a settlement boundary is crossed) drive the ledger and rating
//! engine. Events are published only after the unit commits.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::EngineConfig;
use crate::core::ids::{GameId, MatchId, TeamId, UserId};
use crate::core::store::{Store, Tx};
use crate::game::dispute::Dispute;
use crate::game::state::{Match, MatchPlayer, RosterExt, Scores, Team, TeamSize};
use crate::game::status::{self, MatchStatus};
use crate::ledger::entry::{EntryMetadata, TransactionType};
use crate::ledger::ops::{batch_credit, batch_debit, Ledger};
use crate::rating::apply::apply_match_outcome;
use crate::service::notify::{MatchEvent, Notifier};
use crate::settlement::error::{legal_next, MatchError};
use crate::settlement::payout::{distribute_winnings, Payout, PayoutError};

/// Parameters for a new match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMatch {
    /// Game title.
    pub game_id: GameId,
    /// Credits per player.
    pub wager: i64,
    /// Roster size per side.
    pub team_size: TeamSize,
    /// Matchmaking region.
    pub region: String,
    /// Platform.
    pub platform: String,
    /// Registered team on side A.
    #[serde(default)]
    pub team_a_id: Option<TeamId>,
    /// Registered team on side B.
    #[serde(default)]
    pub team_b_id: Option<TeamId>,
}

/// Result of a ready-state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyOutcome {
    /// The change started the match.
    pub started: bool,
    /// Pot collected when started.
    pub total_pot: Option<i64>,
}

/// Result of a refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundOutcome {
    /// Players credited, empty if no wager was held.
    pub refunded: Vec<UserId>,
    /// Credited to each.
    pub amount_per_player: i64,
}

/// The settlement orchestrator.
#[derive(Clone)]
pub struct MatchService {
    pub(crate) store: Arc<Store>,
    pub(crate) config: EngineConfig,
    pub(crate) notifier: Notifier,
}

impl MatchService {
    /// Create a service over a store.
    pub fn new(store: Arc<Store>, config: EngineConfig, notifier: Notifier) -> Self {
        Self { store, config, notifier }
    }

    /// Ledger over the same store.
    pub fn ledger(&self) -> Ledger {
        Ledger::new(self.store.clone())
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Current match row.
    pub async fn get_match(&self, match_id: MatchId) -> Option<Match> {
        self.store.read(|t| t.get_match(match_id).cloned()).await
    }

    /// Roster in join order.
    pub async fn players(&self, match_id: MatchId) -> Vec<MatchPlayer> {
        self.store.read(|t| t.players(match_id).to_vec()).await
    }

    /// Dispute filed against a match.
    pub async fn dispute_for(&self, match_id: MatchId) -> Option<Dispute> {
        self.store.read(|t| t.dispute(match_id).cloned()).await
    }

    // =========================================================================
    // ROSTER
    // =========================================================================

    /// Create a match in LOBBY with the creator on side A.
    #[instrument(skip(self, req), fields(wager = req.wager))]
    pub async fn create_match(&self, creator: UserId, req: CreateMatch) -> Result<Match, MatchError> {
        if req.wager < 0 {
            return Err(MatchError::Validation(format!("wager must be >= 0, got {}", req.wager)));
        }
        if req.region.trim().is_empty() || req.platform.trim().is_empty() {
            return Err(MatchError::Validation("region and platform are required".into()));
        }
        if req.team_a_id.is_some() && req.team_a_id == req.team_b_id {
            return Err(MatchError::Validation("a team cannot play itself".into()));
        }

        let created = self
            .store
            .atomic(|tx| {
                ensure_funds(tx, creator, req.wager)?;

                let now = tx.now();
                let m = Match {
                    id: MatchId::new(),
                    game_id: req.game_id,
                    wager: req.wager,
                    team_size: req.team_size,
                    region: req.region,
                    platform: req.platform,
                    status: MatchStatus::Lobby,
                    winning_team: None,
                    team_a_score: None,
                    team_b_score: None,
                    team_a_id: req.team_a_id,
                    team_b_id: req.team_b_id,
                    created_by: creator,
                    created_at: now,
                    updated_at: now,
                };
                tx.put_match(m.clone());
                tx.add_player(MatchPlayer {
                    match_id: m.id,
                    user_id: creator,
                    team: Team::A,
                    is_ready: false,
                    joined_at: now,
                });
                Ok::<_, MatchError>(m)
            })
            .await?;

        info!(match_id = %created.id, "Match created");
        Ok(created)
    }

    /// Join a side. The first join after creation opens the match.
    #[instrument(skip(self))]
    pub async fn join_match(&self, match_id: MatchId, user_id: UserId, team: Team) -> Result<(), MatchError> {
        let recipients = self
            .store
            .atomic(|tx| {
                let mut m = load_match(tx, match_id)?;
                if !status::can_join(m.status) {
                    return Err(MatchError::NotJoinable { status: m.status, legal: legal_next(m.status) });
                }

                let roster = tx.players(match_id);
                if roster.member(user_id).is_some() {
                    return Err(MatchError::AlreadyMember(user_id));
                }
                if roster.side_count(team) >= m.team_size.max_per_side() {
                    return Err(MatchError::TeamFull(team));
                }
                ensure_funds(tx, user_id, m.wager)?;

                tx.add_player(MatchPlayer {
                    match_id,
                    user_id,
                    team,
                    is_ready: false,
                    joined_at: tx.now(),
                });
                if m.status == MatchStatus::Lobby {
                    advance(tx, &mut m, MatchStatus::Open)?;
                }
                Ok(roster_ids(tx, match_id))
            })
            .await?;

        debug!(%match_id, %user_id, ?team, "Player joined");
        self.notifier
            .publish(recipients, MatchEvent::PlayerJoined { match_id, user_id, team });
        Ok(())
    }

    /// Leave before the match starts. An OPEN match with an empty side
    /// returns to LOBBY.
    #[instrument(skip(self))]
    pub async fn leave_match(&self, match_id: MatchId, user_id: UserId) -> Result<(), MatchError> {
        let recipients = self
            .store
            .atomic(|tx| {
                let mut m = load_match(tx, match_id)?;
                if !status::can_leave(m.status) {
                    return Err(MatchError::NotLeavable { status: m.status, legal: legal_next(m.status) });
                }
                if !tx.remove_player(match_id, user_id) {
                    return Err(MatchError::NotAMember { match_id, user_id });
                }

                let roster = tx.players(match_id);
                let side_empty = roster.side_count(Team::A) == 0 || roster.side_count(Team::B) == 0;
                if m.status == MatchStatus::Open && side_empty {
                    advance(tx, &mut m, MatchStatus::Lobby)?;
                }

                let mut recipients = roster_ids(tx, match_id);
                recipients.push(user_id);
                Ok::<_, MatchError>(recipients)
            })
            .await?;

        self.notifier
            .publish(recipients, MatchEvent::PlayerLeft { match_id, user_id });
        Ok(())
    }

    // =========================================================================
    // START
    // =========================================================================

    /// Change a ready flag. When every player is ready and both sides are
    /// full, wagers are collected and the match starts in the same unit; if
    /// collection fails nothing is persisted, including the flag.
    #[instrument(skip(self))]
    pub async fn set_ready(&self, match_id: MatchId, user_id: UserId, ready: bool) -> Result<ReadyOutcome, MatchError> {
        let (outcome, recipients) = self
            .store
            .atomic(|tx| {
                let mut m = load_match(tx, match_id)?;
                if !status::can_ready(m.status) {
                    return Err(MatchError::NotReadyable { status: m.status, legal: legal_next(m.status) });
                }
                let player = tx
                    .player_mut(match_id, user_id)
                    .ok_or(MatchError::NotAMember { match_id, user_id })?;
                player.is_ready = ready;

                let mut outcome = ReadyOutcome { started: false, total_pot: None };
                if tx.players(match_id).ready_to_start(m.team_size) {
                    outcome.total_pot = Some(start_match(tx, &mut m)?);
                    outcome.started = true;
                }
                Ok((outcome, roster_ids(tx, match_id)))
            })
            .await?;

        self.notifier.publish(
            recipients.clone(),
            MatchEvent::ReadyChanged { match_id, user_id, ready },
        );
        if let Some(total_pot) = outcome.total_pot {
            info!(%match_id, total_pot, "Match started");
            self.notifier
                .publish(recipients, MatchEvent::MatchStarted { match_id, total_pot });
        }
        Ok(outcome)
    }

    // =========================================================================
    // RESULT
    // =========================================================================

    /// Record a result and pay out. On any distribution failure the match
    /// stays IN_PROGRESS and can be reported again.
    #[instrument(skip(self))]
    pub async fn report_result(
        &self,
        match_id: MatchId,
        user_id: UserId,
        winning_team: Team,
        scores: Option<Scores>,
    ) -> Result<Payout, MatchError> {
        let (payout, recipients) = self
            .store
            .atomic(|tx| {
                let m = load_match(tx, match_id)?;
                if !status::can_report_result(m.status) {
                    return Err(MatchError::NotReportable { status: m.status, legal: legal_next(m.status) });
                }
                if tx.players(match_id).member(user_id).is_none() {
                    return Err(MatchError::NotAMember { match_id, user_id });
                }

                let payout = settle(tx, m, winning_team, scores, &self.config)?;
                Ok((payout, roster_ids(tx, match_id)))
            })
            .await?;

        self.announce_completion(match_id, &payout, recipients);
        Ok(payout)
    }

    pub(crate) fn announce_completion(&self, match_id: MatchId, payout: &Payout, recipients: Vec<UserId>) {
        info!(
            %match_id,
            winning_team = ?payout.winning_team,
            per_winner = payout.plan.per_winner,
            platform_fee = payout.plan.platform_fee,
            "Match completed"
        );
        self.notifier.publish(
            recipients,
            MatchEvent::MatchCompleted {
                match_id,
                winning_team: payout.winning_team,
                per_winner: payout.plan.per_winner,
            },
        );
    }

    // =========================================================================
    // REFUND
    // =========================================================================

    /// Administrative refund, legal from any non-terminal status.
    #[instrument(skip(self, reason))]
    pub async fn refund_match(&self, match_id: MatchId, reason: &str) -> Result<RefundOutcome, MatchError> {
        let (outcome, recipients) = self
            .store
            .atomic(|tx| {
                let outcome = refund(tx, match_id, reason)?;
                Ok::<_, MatchError>((outcome, roster_ids(tx, match_id)))
            })
            .await?;

        info!(%match_id, refunded = outcome.refunded.len(), reason, "Match refunded");
        self.notifier.publish(
            recipients,
            MatchEvent::MatchRefunded { match_id, reason: reason.to_string() },
        );
        Ok(outcome)
    }
}

// =============================================================================
// UNIT-OF-WORK STEPS
// =============================================================================

pub(crate) fn load_match(tx: &Tx<'_>, match_id: MatchId) -> Result<Match, MatchError> {
    tx.get_match(match_id).cloned().ok_or(MatchError::MatchNotFound(match_id))
}

pub(crate) fn roster_ids(tx: &Tx<'_>, match_id: MatchId) -> Vec<UserId> {
    tx.players(match_id).iter().map(|p| p.user_id).collect()
}

/// Move `m` to `to` through the transition table and persist it.
pub(crate) fn advance(tx: &mut Tx<'_>, m: &mut Match, to: MatchStatus) -> Result<(), MatchError> {
    m.status = status::transition(m.status, to)?;
    m.updated_at = tx.now();
    tx.put_match(m.clone());
    Ok(())
}

fn ensure_funds(tx: &Tx<'_>, user_id: UserId, wager: i64) -> Result<(), MatchError> {
    let balance = tx.balance(user_id).unwrap_or(0);
    if balance < wager {
        return Err(MatchError::InsufficientFunds { user_id, balance, required: wager });
    }
    Ok(())
}

/// Collect every wager, then OPEN -> IN_PROGRESS. Returns the pot.
fn start_match(tx: &mut Tx<'_>, m: &mut Match) -> Result<i64, MatchError> {
    let users = roster_ids(tx, m.id);
    // Free matches move no credits and may include players with no account yet.
    let total = if m.wager == 0 {
        0
    } else {
        batch_debit(
            tx,
            &users,
            m.wager,
            TransactionType::WagerDebit,
            &EntryMetadata::Wager { match_id: m.id },
        )?
        .total
    };
    advance(tx, m, MatchStatus::InProgress)?;
    Ok(total)
}

/// Pay out, rate (best effort), then mark COMPLETED.
pub(crate) fn settle(
    tx: &mut Tx<'_>,
    mut m: Match,
    winning_team: Team,
    scores: Option<Scores>,
    config: &EngineConfig,
) -> Result<Payout, MatchError> {
    let players = tx.players(m.id).to_vec();

    let payout = distribute_winnings(
        tx,
        &m,
        &players,
        winning_team,
        config.platform_fee_bps,
        config.fee_collector,
    )
    .map_err(|source| MatchError::SettlementFailed { match_id: m.id, source })?;

    match tx.savepoint(|sp| apply_match_outcome(sp, &m, &players, winning_team)) {
        Ok(outcome) => debug!(match_id = %m.id, changes = outcome.players.len(), "Ratings applied"),
        Err(e) => warn!(match_id = %m.id, "Rating update failed, payout kept: {}", e),
    }

    m.winning_team = Some(winning_team);
    m.team_a_score = scores.map(|s| s.team_a);
    m.team_b_score = scores.map(|s| s.team_b);
    advance(tx, &mut m, MatchStatus::Completed)?;
    close_dispute(tx, m.id);

    Ok(payout)
}

/// Return held wagers and mark REFUNDED.
pub(crate) fn refund(tx: &mut Tx<'_>, match_id: MatchId, reason: &str) -> Result<RefundOutcome, MatchError> {
    let mut m = load_match(tx, match_id)?;
    if !status::can_refund(m.status) {
        return Err(MatchError::NotRefundable { status: m.status });
    }

    let mut outcome = RefundOutcome { refunded: Vec::new(), amount_per_player: 0 };
    if status::wagers_held(m.status) {
        let users = roster_ids(tx, match_id);
        let metadata = EntryMetadata::Refund { match_id, reason: reason.to_string() };
        batch_credit(tx, &users, m.wager, TransactionType::Refund, &metadata)
            .map_err(|e| MatchError::SettlementFailed { match_id, source: PayoutError::Ledger(e) })?;
        outcome = RefundOutcome { refunded: users, amount_per_player: m.wager };
    }

    advance(tx, &mut m, MatchStatus::Refunded)?;
    close_dispute(tx, match_id);
    Ok(outcome)
}

fn close_dispute(tx: &mut Tx<'_>, match_id: MatchId) {
    let now = tx.now();
    if let Some(dispute) = tx.dispute_mut(match_id) {
        dispute.resolved_at.get_or_insert(now);
    }
}
