//! Tilepath Demo
//!
//! Scripted playthrough of the memory game against an in-memory ledger:
//! a bot watches each presentation, replays the path (fumbling once on
//! purpose), and every completion is published for history and
//! leaderboard reporting.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use tilepath::game::engine::{FixedClock, GameEngine};
use tilepath::ledger::coordinator::{MemoryKnownPlayers, PublishConfig, PUBLISH_ENABLED_VAR};
use tilepath::ledger::mock::MemoryLedger;
use tilepath::{
    GameEvent, LedgerPublisher, LevelCatalog, PlayerAddress, PublishCoordinator, PublishOutcome,
    Screen, FEEDBACK_DELAY_MS, REVEAL_STEP_MS, SETUP_DELAY_MS, VERSION,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    info!("Tilepath v{}", VERSION);

    demo_session().await
}

/// Run a two-level scripted session and report the ledger contents.
async fn demo_session() -> Result<()> {
    info!("=== Starting Demo Session ===");

    let player: PlayerAddress = "0x00a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3".parse()?;
    info!("Player: {}", player);

    // Compose the pipeline: in-memory ledger, publisher, coordinator.
    // The env toggle is honored when set; unset means show the full demo.
    let mut config = PublishConfig::from_env();
    if std::env::var_os(PUBLISH_ENABLED_VAR).is_none() {
        config.enabled = true;
    }
    if !config.enabled {
        info!("Publishing disabled by {}", PUBLISH_ENABLED_VAR);
    }

    let ledger = MemoryLedger::new();
    let publisher = LedgerPublisher::new(Arc::new(ledger.clone()));
    let coordinator =
        PublishCoordinator::new(publisher, Box::new(MemoryKnownPlayers::new()), config);
    coordinator.connect(Some(player)).await?;

    let seed = 20260806;
    let mut engine = GameEngine::with_clock(
        LevelCatalog::standard(),
        seed,
        Box::new(FixedClock(1_754_500_000)),
    );
    info!("RNG Seed: {}", seed);

    engine.start_game()?;

    // Level 1: flawless clear
    play_level(&mut engine, &coordinator, false).await?;
    engine.next_level()?;

    // Level 2: one mistake, then a clear on the retry
    play_level(&mut engine, &coordinator, true).await?;

    report(&coordinator).await;
    Ok(())
}

/// Watch the presentation, then replay the path.
async fn play_level(
    engine: &mut GameEngine,
    coordinator: &PublishCoordinator,
    fumble_first: bool,
) -> Result<()> {
    let level = engine.level();
    let path = engine.path().to_vec();
    info!(
        "Level {}: {}x{} board, {} tiles to memorize",
        level,
        engine.grid_dim(),
        engine.grid_dim(),
        path.len()
    );

    // Watch the whole presentation
    engine.advance_by(SETUP_DELAY_MS + REVEAL_STEP_MS * path.len() as u64);
    drain_events(engine, coordinator).await;

    if fumble_first {
        let bad = (0..engine.grid_dim() * engine.grid_dim())
            .find(|&c| c != path[0])
            .expect("board always has a wrong tile");
        engine.handle_tile_click(bad);
        info!("Oops: tile {} was wrong, {} lives left", bad, engine.lives());
        engine.advance_by(FEEDBACK_DELAY_MS);
    }

    for &cell in &path {
        engine.handle_tile_click(cell);
    }
    drain_events(engine, coordinator).await;

    engine.advance_by(FEEDBACK_DELAY_MS);
    info!(
        "Level {} cleared: score {}, lives {}, screen {:?}",
        level,
        engine.score(),
        engine.lives(),
        engine.screen()
    );
    debug_assert_eq!(engine.screen(), Screen::LevelComplete);
    Ok(())
}

/// Forward engine events to the publishing pipeline.
async fn drain_events(engine: &mut GameEngine, coordinator: &PublishCoordinator) {
    for event in engine.take_events() {
        if let GameEvent::LevelCompleted { level, score, .. } = &event {
            info!("Level {} complete at score {}", level, score);
        }

        match coordinator.handle_event(&event).await {
            Some(PublishOutcome::Published(tx)) => info!("Recorded on ledger: {}", tx),
            Some(PublishOutcome::Unavailable(reason)) => info!("Not recorded: {}", reason),
            Some(PublishOutcome::Failed(message)) => warn!("Publish failed: {}", message),
            None => {}
        }
    }
}

/// Print history and leaderboard from the ledger.
async fn report(coordinator: &PublishCoordinator) {
    info!("=== Session Records ===");

    for record in coordinator.history().await {
        let when = chrono::DateTime::from_timestamp(record.end_time as i64, 0)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| record.end_time.to_string());
        info!(
            "Level {} | score {} | {} lives | {}s | {}",
            record.level,
            record.score,
            record.lives_remaining,
            record.duration_secs(),
            when
        );
    }

    info!("=== Leaderboard ===");
    for (rank, entry) in coordinator.leaderboard().await.iter().enumerate() {
        info!(
            "#{}: {} - level {}, {} pts over {} clears",
            rank + 1,
            entry.player,
            entry.highest_level,
            entry.total_score,
            entry.completions
        );
    }
}
