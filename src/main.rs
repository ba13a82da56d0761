//! Wager Arena
//!
//! Runs a demo of the settlement core against the in-process store: a paid
//! 1v1, a disputed 2v2 resolved by an admin, and the deadline sweeper.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use wager_arena::{
    config::{EngineConfig, SweeperConfig},
    core::ids::{GameId, UserId},
    core::store::Store,
    game::state::{Scores, Team, TeamSize},
    service::{auth::AuthConfig, notify::Notifier, sweeper::DeadlineSweeper},
    settlement::{CreateMatch, MatchService},
    VERSION,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    let config = EngineConfig::from_env();
    info!("Wager Arena v{}", VERSION);
    info!(
        "Platform fee: {} bps, dispute window: {}h",
        config.platform_fee_bps,
        config.dispute_window.num_hours()
    );

    let auth = AuthConfig::from_env();
    if !auth.is_configured() {
        warn!("AUTH_SECRET / AUTH_PUBLIC_KEY_PEM not set, admin calls cannot be authorized");
    }

    let (notifier, mut events) = Notifier::channel(config.notify_capacity);
    let service = MatchService::new(Arc::new(Store::new()), config, notifier);

    let printer = tokio::spawn(async move {
        while let Some(n) = events.recv().await {
            if let Ok(json) = n.event.to_json() {
                info!(recipients = n.recipients.len(), "event {}", json);
            }
        }
    });

    let sweeper = DeadlineSweeper::spawn(service.clone(), SweeperConfig::from_env());

    demo_solo(&service).await?;
    demo_disputed_duo(&service).await?;

    sweeper.shutdown().await;
    drop(service);
    let _ = printer.await;
    Ok(())
}

/// Fund `n` fresh accounts.
async fn fund(service: &MatchService, n: usize, amount: i64) -> Result<Vec<UserId>> {
    let ledger = service.ledger();
    let mut users = Vec::with_capacity(n);
    for i in 0..n {
        let user = UserId::new();
        ledger.deposit(user, amount, format!("demo-deposit-{}", i)).await?;
        users.push(user);
    }
    Ok(users)
}

/// 1v1 for 50 credits each, reported and paid out.
async fn demo_solo(service: &MatchService) -> Result<()> {
    info!("=== Solo Match ===");
    let users = fund(service, 2, 200).await?;
    let game = GameId::new();

    let m = service
        .create_match(
            users[0],
            CreateMatch {
                game_id: game,
                wager: 50,
                team_size: TeamSize::Solo,
                region: "eu-west".into(),
                platform: "pc".into(),
                team_a_id: None,
                team_b_id: None,
            },
        )
        .await?;
    service.join_match(m.id, users[1], Team::B).await?;
    service.set_ready(m.id, users[0], true).await?;
    let started = service.set_ready(m.id, users[1], true).await?;
    info!("Started: {:?}", started);

    let payout = service
        .report_result(m.id, users[0], Team::A, Some(Scores { team_a: 3, team_b: 1 }))
        .await?;
    info!(
        "Pot {} -> fee {}, {} to each winner",
        payout.plan.total_pot, payout.plan.platform_fee, payout.plan.per_winner
    );

    let ledger = service.ledger();
    for user in &users {
        info!("Balance {}: {}", user, ledger.balance(*user).await);
    }
    Ok(())
}

/// 2v2 disputed after start and decided by an admin.
async fn demo_disputed_duo(service: &MatchService) -> Result<()> {
    info!("=== Disputed Duo Match ===");
    let users = fund(service, 4, 500).await?;

    let m = service
        .create_match(
            users[0],
            CreateMatch {
                game_id: GameId::new(),
                wager: 100,
                team_size: TeamSize::Duo,
                region: "na-east".into(),
                platform: "console".into(),
                team_a_id: None,
                team_b_id: None,
            },
        )
        .await?;
    service.join_match(m.id, users[1], Team::A).await?;
    service.join_match(m.id, users[2], Team::B).await?;
    service.join_match(m.id, users[3], Team::B).await?;
    for user in &users {
        service.set_ready(m.id, *user, true).await?;
    }

    let dispute = service
        .file_dispute(m.id, users[2], "opponent disconnected us", Some("https://clips.example/1"))
        .await?;
    info!("Dispute {} open until {}", dispute.id, dispute.deadline);

    service
        .escalate_dispute(m.id, wager_arena::MatchStatus::AwaitingOpponentEvidence)
        .await?;
    let status = service
        .submit_evidence(m.id, users[0], "https://clips.example/2", "full recording")
        .await?;
    info!("Status after evidence: {}", status);

    let payout = service.resolve_dispute(m.id, Team::B, None).await?;
    info!("Admin awarded side {:?}, {} each", payout.winning_team, payout.plan.per_winner);
    Ok(())
}
