// Matchup tracker entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Load the player dataset into the directory
// 4. Open the watchlist store
// 5. Build dashboard state, load the user's watchlist
// 6. Start the score simulator, fanning updates into a channel
// 7. Spawn the dashboard event loop
// 8. Wait for Ctrl+C, stop the simulator, clean shutdown

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info};

use matchup_tracker::app::{self, DashboardState, ScoreEvent};
use matchup_tracker::config;
use matchup_tracker::players::{load_players, PlayerDirectory};
use matchup_tracker::sim::ScoreSimulator;
use matchup_tracker::watchlist::SqliteWatchlistStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, not the terminal)
    init_tracing()?;
    info!("Matchup tracker starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;

    // 3. Load the player dataset
    let players = load_players(Path::new(&config.data.players))
        .with_context(|| format!("failed to load player data from {}", config.data.players))?;
    info!("Loaded {} players from {}", players.len(), config.data.players);
    let directory = Arc::new(PlayerDirectory::new(players));

    // 4. Open the watchlist store
    let store = SqliteWatchlistStore::open(&config.database.path)
        .with_context(|| format!("failed to open watchlist database at {}", config.database.path))?;
    info!("Watchlist database opened at {}", config.database.path);

    // 5. Build dashboard state and load the persisted watchlist
    let email = config.user.email.clone();
    match &email {
        Some(email) => info!("Signed in as {email}"),
        None => info!("No user configured; watchlist persistence disabled"),
    }
    let mut state = DashboardState::new(Arc::clone(&directory), Arc::new(store), email);
    state.load_watchlist().await;

    // 6. Start the score simulator; its callback forwards updates into the
    // dashboard's event channel.
    let (tx, rx) = mpsc::unbounded_channel();
    let simulator = ScoreSimulator::new(Arc::clone(&directory));
    simulator.start(move |player_id, season_points| {
        let _ = tx.send(ScoreEvent {
            player_id,
            season_points,
        });
    });

    // 7. Spawn the dashboard event loop
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(rx, state).await {
            error!("Dashboard loop error: {}", e);
        }
    });

    // 8. Wait for Ctrl+C, then stop everything
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    // Stopping the simulator drops the callback (and its channel sender),
    // which closes the channel and lets the dashboard loop exit.
    simulator.stop();

    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;

    info!("Matchup tracker shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("matchup-tracker.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("matchup_tracker=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
