//! Dispute / Evidence Workflow
//!
//! A dispute diverts an IN_PROGRESS match away from normal settlement:
//!
//! ```text
//! IN_PROGRESS -> DISPUTED -> AWAITING_OPPONENT_EVIDENCE -> AWAITING_ADMIN_REVIEW -> COMPLETED
//!                    |                                          ^            \
//!                    +------------------------------------------+             -> REFUNDED
//! ```
//!
//! Evidence submitted while AWAITING_OPPONENT_EVIDENCE escalates to admin
//! review automatically; every other move is an admin decision or the
//! deadline sweep.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::core::ids::{MatchId, UserId};
use crate::core::store::Tx;
use crate::game::dispute::{Dispute, Evidence};
use crate::game::state::{RosterExt, Scores, Team};
use crate::game::status::{self, MatchStatus};
use crate::service::notify::MatchEvent;
use crate::settlement::error::{legal_next, MatchError};
use crate::settlement::orchestrator::{advance, load_match, refund, roster_ids, settle, MatchService};
use crate::settlement::payout::Payout;

/// Refund reason recorded when admin review never happened.
pub const REVIEW_EXPIRED_REASON: &str = "dispute review window elapsed";

/// What a deadline sweep did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Matches moved to AWAITING_ADMIN_REVIEW.
    pub escalated: Vec<MatchId>,
    /// Matches refunded after the review grace period.
    pub refunded: Vec<MatchId>,
}

impl SweepReport {
    /// Nothing was changed.
    pub fn is_empty(&self) -> bool {
        self.escalated.is_empty() && self.refunded.is_empty()
    }
}

fn require_dispute(tx: &Tx<'_>, match_id: MatchId) -> Result<(), MatchError> {
    match tx.dispute(match_id) {
        Some(d) if !d.is_resolved() => Ok(()),
        _ => Err(MatchError::NoDisputeFound(match_id)),
    }
}

fn escalate(tx: &mut Tx<'_>, match_id: MatchId, target: MatchStatus) -> Result<(), MatchError> {
    let mut m = load_match(tx, match_id)?;
    require_dispute(tx, match_id)?;
    advance(tx, &mut m, target)
}

impl MatchService {
    /// File a dispute on an IN_PROGRESS match, optionally with first evidence.
    #[instrument(skip(self, reason, evidence_link))]
    pub async fn file_dispute(
        &self,
        match_id: MatchId,
        user_id: UserId,
        reason: &str,
        evidence_link: Option<&str>,
    ) -> Result<Dispute, MatchError> {
        if reason.trim().is_empty() {
            return Err(MatchError::Validation("dispute reason is required".into()));
        }
        let window = self.config.dispute_window;

        let (dispute, recipients) = self
            .store
            .atomic(|tx| {
                let mut m = load_match(tx, match_id)?;
                if tx.dispute(match_id).is_some() {
                    return Err(MatchError::DisputeAlreadyExists(match_id));
                }
                if !status::can_dispute(m.status) {
                    return Err(MatchError::NotDisputable { status: m.status, legal: legal_next(m.status) });
                }
                if tx.players(match_id).member(user_id).is_none() {
                    return Err(MatchError::NotAMember { match_id, user_id });
                }

                let now = tx.now();
                let mut dispute = Dispute::open(match_id, user_id, reason.to_string(), now, window);
                if let Some(link) = evidence_link.filter(|l| !l.trim().is_empty()) {
                    dispute.evidence.push(Evidence {
                        user_id,
                        link: link.to_string(),
                        message: reason.to_string(),
                        created_at: now,
                    });
                }
                tx.put_dispute(dispute.clone());
                advance(tx, &mut m, MatchStatus::Disputed)?;

                Ok((dispute, roster_ids(tx, match_id)))
            })
            .await?;

        info!(%match_id, dispute_id = %dispute.id, deadline = %dispute.deadline, "Dispute filed");
        self.notifier.publish(
            recipients,
            MatchEvent::DisputeFiled { match_id, dispute_id: dispute.id, initiator_id: user_id },
        );
        Ok(dispute)
    }

    /// Attach evidence. Returns the match status afterwards.
    #[instrument(skip(self, link, message))]
    pub async fn submit_evidence(
        &self,
        match_id: MatchId,
        user_id: UserId,
        link: &str,
        message: &str,
    ) -> Result<MatchStatus, MatchError> {
        if link.trim().is_empty() {
            return Err(MatchError::Validation("evidence link is required".into()));
        }

        let (status_after, escalated, recipients) = self
            .store
            .atomic(|tx| {
                let mut m = load_match(tx, match_id)?;
                if !status::can_submit_evidence(m.status) {
                    return Err(MatchError::NotInEvidencePhase { status: m.status, legal: legal_next(m.status) });
                }
                if tx.players(match_id).member(user_id).is_none() {
                    return Err(MatchError::NotAMember { match_id, user_id });
                }
                require_dispute(tx, match_id)?;

                let now = tx.now();
                if let Some(dispute) = tx.dispute_mut(match_id) {
                    dispute.evidence.push(Evidence {
                        user_id,
                        link: link.to_string(),
                        message: message.to_string(),
                        created_at: now,
                    });
                }

                let escalated = m.status == MatchStatus::AwaitingOpponentEvidence;
                if escalated {
                    advance(tx, &mut m, MatchStatus::AwaitingAdminReview)?;
                }
                Ok((m.status, escalated, roster_ids(tx, match_id)))
            })
            .await?;

        self.notifier
            .publish(recipients.clone(), MatchEvent::EvidenceSubmitted { match_id, user_id });
        if escalated {
            info!(%match_id, "Opponent evidence received, awaiting admin review");
            self.notifier
                .publish(recipients, MatchEvent::DisputeEscalated { match_id, status: status_after });
        }
        Ok(status_after)
    }

    /// Admin: move a dispute to AWAITING_OPPONENT_EVIDENCE or
    /// AWAITING_ADMIN_REVIEW.
    #[instrument(skip(self))]
    pub async fn escalate_dispute(&self, match_id: MatchId, target: MatchStatus) -> Result<(), MatchError> {
        if !matches!(
            target,
            MatchStatus::AwaitingOpponentEvidence | MatchStatus::AwaitingAdminReview
        ) {
            return Err(MatchError::Validation(format!("{} is not an escalation target", target)));
        }

        let recipients = self
            .store
            .atomic(|tx| {
                escalate(tx, match_id, target)?;
                Ok::<_, MatchError>(roster_ids(tx, match_id))
            })
            .await?;

        info!(%match_id, %target, "Dispute escalated");
        self.notifier
            .publish(recipients, MatchEvent::DisputeEscalated { match_id, status: target });
        Ok(())
    }

    /// Admin: decide a disputed match and pay out the chosen side.
    #[instrument(skip(self))]
    pub async fn resolve_dispute(
        &self,
        match_id: MatchId,
        winning_team: Team,
        scores: Option<Scores>,
    ) -> Result<Payout, MatchError> {
        let (payout, recipients) = self
            .store
            .atomic(|tx| {
                let m = load_match(tx, match_id)?;
                if !status::requires_admin_action(m.status) {
                    return Err(MatchError::NotAwaitingReview { status: m.status, legal: legal_next(m.status) });
                }
                let payout = settle(tx, m, winning_team, scores, &self.config)?;
                Ok((payout, roster_ids(tx, match_id)))
            })
            .await?;

        self.announce_completion(match_id, &payout, recipients);
        Ok(payout)
    }

    /// Enforce elapsed dispute deadlines as of `now`.
    ///
    /// DISPUTED and AWAITING_OPPONENT_EVIDENCE matches past the deadline go to
    /// admin review; AWAITING_ADMIN_REVIEW matches past the deadline plus the
    /// review grace period are refunded. Each match is its own unit of work,
    /// so one failure does not stop the sweep.
    pub async fn sweep_expired_disputes(&self, now: DateTime<Utc>) -> SweepReport {
        let grace = self.config.admin_review_grace;
        let candidates: Vec<MatchId> = self
            .store
            .read(|t| {
                t.disputes()
                    .filter(|d| !d.is_resolved() && d.is_expired(now))
                    .map(|d| d.match_id)
                    .collect()
            })
            .await;

        let mut report = SweepReport::default();
        for match_id in candidates {
            let result = self
                .store
                .atomic_at(now, |tx| -> Result<Option<(MatchStatus, Vec<UserId>)>, MatchError> {
                    let m = load_match(tx, match_id)?;
                    let Some(deadline) = tx.dispute(match_id).map(|d| d.deadline) else {
                        return Ok(None);
                    };
                    match m.status {
                        MatchStatus::Disputed | MatchStatus::AwaitingOpponentEvidence => {
                            escalate(tx, match_id, MatchStatus::AwaitingAdminReview)?;
                            Ok(Some((MatchStatus::AwaitingAdminReview, roster_ids(tx, match_id))))
                        }
                        MatchStatus::AwaitingAdminReview if now >= deadline + grace => {
                            refund(tx, match_id, REVIEW_EXPIRED_REASON)?;
                            Ok(Some((MatchStatus::Refunded, roster_ids(tx, match_id))))
                        }
                        _ => Ok(None),
                    }
                })
                .await;

            match result {
                Ok(Some((MatchStatus::Refunded, recipients))) => {
                    info!(%match_id, "Unreviewed dispute refunded");
                    self.notifier.publish(
                        recipients,
                        MatchEvent::MatchRefunded { match_id, reason: REVIEW_EXPIRED_REASON.into() },
                    );
                    report.refunded.push(match_id);
                }
                Ok(Some((status, recipients))) => {
                    info!(%match_id, "Dispute deadline elapsed, escalated to admin review");
                    self.notifier
                        .publish(recipients, MatchEvent::DisputeEscalated { match_id, status });
                    report.escalated.push(match_id);
                }
                Ok(None) => {}
                Err(e) => error!(%match_id, "Dispute sweep failed: {}", e),
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::core::ids::GameId;
    use crate::core::store::Store;
    use crate::game::state::TeamSize;
    use crate::service::notify::Notifier;
    use crate::settlement::orchestrator::CreateMatch;
    use chrono::Duration;
    use std::sync::Arc;

    fn service() -> MatchService {
        MatchService::new(Arc::new(Store::new()), EngineConfig::default(), Notifier::disabled())
    }

    async fn funded(service: &MatchService) -> UserId {
        let user = UserId::new();
        service.ledger().deposit(user, 200, "seed").await.unwrap();
        user
    }

    fn solo(wager: i64) -> CreateMatch {
        CreateMatch {
            game_id: GameId::new(),
            wager,
            team_size: TeamSize::Solo,
            region: "eu".into(),
            platform: "pc".into(),
            team_a_id: None,
            team_b_id: None,
        }
    }

    async fn started(service: &MatchService) -> (MatchId, UserId, UserId) {
        let a = funded(service).await;
        let b = funded(service).await;
        let m = service.create_match(a, solo(50)).await.unwrap();
        service.join_match(m.id, b, Team::B).await.unwrap();
        service.set_ready(m.id, a, true).await.unwrap();
        service.set_ready(m.id, b, true).await.unwrap();
        (m.id, a, b)
    }

    async fn status_of(service: &MatchService, match_id: MatchId) -> MatchStatus {
        service.get_match(match_id).await.unwrap().status
    }

    #[tokio::test]
    async fn test_file_dispute() {
        let service = service();
        let (match_id, a, b) = started(&service).await;

        let dispute = service
            .file_dispute(match_id, a, "they used a banned weapon", Some("https://clips/1"))
            .await
            .unwrap();
        assert_eq!(dispute.initiator_id, a);
        assert_eq!(dispute.deadline, dispute.created_at + Duration::hours(48));
        assert_eq!(dispute.evidence.len(), 1);
        assert_eq!(status_of(&service, match_id).await, MatchStatus::Disputed);

        let again = service.file_dispute(match_id, b, "no, they did", None).await;
        assert_eq!(again, Err(MatchError::DisputeAlreadyExists(match_id)));
    }

    #[tokio::test]
    async fn test_file_dispute_guards() {
        let service = service();
        let a = funded(&service).await;
        let lobby = service.create_match(a, solo(50)).await.unwrap();
        assert!(matches!(
            service.file_dispute(lobby.id, a, "early", None).await,
            Err(MatchError::NotDisputable { status: MatchStatus::Lobby, .. })
        ));

        let (match_id, _, _) = started(&service).await;
        assert!(matches!(
            service.file_dispute(match_id, a, "  ", None).await,
            Err(MatchError::Validation(_))
        ));
        let outsider = UserId::new();
        assert_eq!(
            service.file_dispute(match_id, outsider, "spectator opinion", None).await,
            Err(MatchError::NotAMember { match_id, user_id: outsider })
        );
        assert_eq!(status_of(&service, match_id).await, MatchStatus::InProgress);
    }

    #[tokio::test]
    async fn test_completed_match_cannot_be_disputed() {
        let service = service();
        let (match_id, a, b) = started(&service).await;
        service.report_result(match_id, a, Team::A, None).await.unwrap();

        assert!(matches!(
            service.file_dispute(match_id, b, "wrong winner", None).await,
            Err(MatchError::NotDisputable { status: MatchStatus::Completed, .. })
        ));
    }

    #[tokio::test]
    async fn test_evidence_while_disputed_does_not_escalate() {
        let service = service();
        let (match_id, a, b) = started(&service).await;
        service.file_dispute(match_id, a, "lag switch", None).await.unwrap();

        let status = service
            .submit_evidence(match_id, b, "https://clips/2", "my side")
            .await
            .unwrap();
        assert_eq!(status, MatchStatus::Disputed);
        let dispute = service.dispute_for(match_id).await.unwrap();
        assert_eq!(dispute.evidence.len(), 1);
        assert_eq!(dispute.evidence[0].user_id, b);
    }

    #[tokio::test]
    async fn test_opponent_evidence_escalates_to_review() {
        let service = service();
        let (match_id, a, b) = started(&service).await;
        service.file_dispute(match_id, a, "lag switch", None).await.unwrap();
        service
            .escalate_dispute(match_id, MatchStatus::AwaitingOpponentEvidence)
            .await
            .unwrap();

        let status = service
            .submit_evidence(match_id, b, "https://clips/3", "full vod")
            .await
            .unwrap();
        assert_eq!(status, MatchStatus::AwaitingAdminReview);
        assert_eq!(status_of(&service, match_id).await, MatchStatus::AwaitingAdminReview);

        // Still accepted during review, no further move.
        let status = service
            .submit_evidence(match_id, a, "https://clips/4", "more")
            .await
            .unwrap();
        assert_eq!(status, MatchStatus::AwaitingAdminReview);
    }

    #[tokio::test]
    async fn test_evidence_outside_dispute_rejected() {
        let service = service();
        let (match_id, a, _) = started(&service).await;

        assert!(matches!(
            service.submit_evidence(match_id, a, "https://clips/5", "").await,
            Err(MatchError::NotInEvidencePhase { status: MatchStatus::InProgress, .. })
        ));

        service.file_dispute(match_id, a, "lag", None).await.unwrap();
        assert!(matches!(
            service.submit_evidence(match_id, a, "", "no link").await,
            Err(MatchError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_escalate_guards() {
        let service = service();
        let (match_id, a, _) = started(&service).await;

        assert!(matches!(
            service.escalate_dispute(match_id, MatchStatus::Completed).await,
            Err(MatchError::Validation(_))
        ));
        assert_eq!(
            service.escalate_dispute(match_id, MatchStatus::AwaitingAdminReview).await,
            Err(MatchError::NoDisputeFound(match_id))
        );

        service.file_dispute(match_id, a, "lag", None).await.unwrap();
        service
            .escalate_dispute(match_id, MatchStatus::AwaitingAdminReview)
            .await
            .unwrap();
        // AWAITING_ADMIN_REVIEW cannot go back to waiting on the opponent.
        assert!(matches!(
            service.escalate_dispute(match_id, MatchStatus::AwaitingOpponentEvidence).await,
            Err(MatchError::InvalidTransition(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_dispute_pays_out() {
        let service = service();
        let (match_id, a, b) = started(&service).await;
        service.file_dispute(match_id, b, "scoreboard bug", None).await.unwrap();

        assert!(matches!(
            service.resolve_dispute(match_id, Team::B, None).await,
            Err(MatchError::NotAwaitingReview { status: MatchStatus::Disputed, .. })
        ));

        service
            .escalate_dispute(match_id, MatchStatus::AwaitingAdminReview)
            .await
            .unwrap();
        let payout = service
            .resolve_dispute(match_id, Team::B, Some(Scores { team_a: 1, team_b: 2 }))
            .await
            .unwrap();
        assert_eq!(payout.winners, vec![b]);

        let ledger = service.ledger();
        assert_eq!(ledger.balance(a).await, 150);
        assert_eq!(ledger.balance(b).await, 240);

        let m = service.get_match(match_id).await.unwrap();
        assert_eq!(m.status, MatchStatus::Completed);
        assert_eq!(m.winning_team, Some(Team::B));
        assert!(service.dispute_for(match_id).await.unwrap().is_resolved());
    }

    #[tokio::test]
    async fn test_refund_during_dispute() {
        let service = service();
        let (match_id, a, b) = started(&service).await;
        service.file_dispute(match_id, a, "server crash", None).await.unwrap();
        service
            .escalate_dispute(match_id, MatchStatus::AwaitingOpponentEvidence)
            .await
            .unwrap();

        let outcome = service.refund_match(match_id, "no clear winner").await.unwrap();
        assert_eq!(outcome.refunded.len(), 2);
        assert_eq!(service.ledger().balance(a).await, 200);
        assert_eq!(service.ledger().balance(b).await, 200);
        assert!(service.dispute_for(match_id).await.unwrap().is_resolved());
    }

    #[tokio::test]
    async fn test_sweep_escalates_then_refunds() {
        let service = service();
        let (match_id, a, b) = started(&service).await;
        let dispute = service.file_dispute(match_id, a, "cheating", None).await.unwrap();

        let report = service.sweep_expired_disputes(dispute.created_at).await;
        assert!(report.is_empty());

        let report = service
            .sweep_expired_disputes(dispute.deadline + Duration::minutes(1))
            .await;
        assert_eq!(report.escalated, vec![match_id]);
        assert!(report.refunded.is_empty());
        assert_eq!(status_of(&service, match_id).await, MatchStatus::AwaitingAdminReview);

        // Within the review grace period nothing happens.
        let report = service
            .sweep_expired_disputes(dispute.deadline + Duration::hours(24))
            .await;
        assert!(report.is_empty());

        let report = service
            .sweep_expired_disputes(dispute.deadline + Duration::hours(72))
            .await;
        assert_eq!(report.refunded, vec![match_id]);
        assert_eq!(status_of(&service, match_id).await, MatchStatus::Refunded);
        assert_eq!(service.ledger().balance(a).await, 200);
        assert_eq!(service.ledger().balance(b).await, 200);

        let report = service
            .sweep_expired_disputes(dispute.deadline + Duration::hours(500))
            .await;
        assert!(report.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_ignores_resolved_disputes() {
        let service = service();
        let (match_id, a, _) = started(&service).await;
        let dispute = service.file_dispute(match_id, a, "cheating", None).await.unwrap();
        service
            .escalate_dispute(match_id, MatchStatus::AwaitingAdminReview)
            .await
            .unwrap();
        service.resolve_dispute(match_id, Team::A, None).await.unwrap();

        let report = service
            .sweep_expired_disputes(dispute.deadline + Duration::hours(500))
            .await;
        assert!(report.is_empty());
        assert_eq!(status_of(&service, match_id).await, MatchStatus::Completed);
    }
}
