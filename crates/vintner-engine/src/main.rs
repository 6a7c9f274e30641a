//! Console driver for the Vintner simulation.
//!
//! Wires the tick scheduler to in-memory storage, a logging notification
//! bus, and a demo winery, then advances time only when asked to on
//! standard input.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `vintner-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Validate the starting calendar position
//! 4. Build the in-memory collaborators and the scheduler
//! 5. Read console commands until `quit` or end of input
//!
//! # Commands
//!
//! - `tick [N]` or an empty line -- advance one (or N) weeks
//! - `status` -- log the date, economy, and winery figures
//! - `prompt <text>` -- queue a blocking prompt
//! - `fail-writes on|off` -- simulate a store outage
//! - `quit` -- exit

mod console;
mod demo;
mod error;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt as _, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use vintner_core::clock::GameClock;
use vintner_core::collaborators::{BlockingPrompts, NotificationBus, StateStore};
use vintner_core::config::{LoggingConfig, VintnerConfig};
use vintner_core::scheduler::{TickOutcome, TickScheduler};
use vintner_core::store::{BroadcastSignal, InMemoryStore, LogNotificationBus, PromptQueue};

use crate::console::Command;
use crate::demo::DemoWinery;
use crate::error::EngineError;

/// Notifications kept for the `status` command.
const NOTIFICATION_HISTORY: usize = 64;

/// Everything the console loop talks to.
struct Session {
    scheduler: TickScheduler,
    store: Arc<InMemoryStore>,
    prompts: Arc<PromptQueue>,
    notifications: Arc<LogNotificationBus>,
    winery: Arc<DemoWinery>,
}

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid or console input fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, config_found) = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!("vintner-engine starting");
    if !config_found {
        info!("Config file not found, using defaults");
    }
    info!(
        weeks_per_season = config.calendar.weeks_per_season,
        starting_phase = %config.economy.starting_phase,
        achievement_interval_weeks = config.ticks.achievement_interval_weeks,
        aggregate_notifications = config.ticks.aggregate_notifications,
        "Configuration loaded"
    );

    // 3. Validate the start date.
    let clock = GameClock::new(&config.calendar)?;
    info!(date = %clock.date(), "Calendar initialized");

    // 4. Build collaborators and the scheduler.
    let session = build_session(&config);
    info!("Ready. Press enter to advance a week, or type `status`, `prompt <text>`, `quit`");

    // 5. Console loop.
    run_console(&session).await?;

    info!(
        ticks = session.scheduler.ticks_advanced(),
        rejected = session.scheduler.ticks_rejected(),
        "vintner-engine shutdown complete"
    );
    Ok(())
}

/// Load configuration from `VINTNER_CONFIG` or `vintner-config.yaml`.
///
/// Returns the config and whether a file was found.
fn load_config() -> Result<(VintnerConfig, bool), EngineError> {
    let path = std::env::var_os("VINTNER_CONFIG")
        .map_or_else(|| PathBuf::from("vintner-config.yaml"), PathBuf::from);
    if path.exists() {
        Ok((VintnerConfig::from_file(&path)?, true))
    } else {
        Ok((VintnerConfig::default(), false))
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// Assemble the in-memory game.
fn build_session(config: &VintnerConfig) -> Session {
    let store = Arc::new(InMemoryStore::from_config(config));
    let prompts = Arc::new(PromptQueue::new());
    let notifications = Arc::new(LogNotificationBus::new(NOTIFICATION_HISTORY));
    let broadcast = Arc::new(BroadcastSignal::new());
    let winery = Arc::new(DemoWinery::new(config.economy.seed, true));

    // Stand-in for a reactive UI: log every change signal.
    let mut signals = broadcast.subscribe();
    tokio::spawn(async move {
        loop {
            match signals.recv().await {
                Ok(seq) => debug!(seq, "UI refresh"),
                Err(RecvError::Lagged(missed)) => debug!(missed, "UI refresh lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let collaborators = winery.collaborators(
        Arc::clone(&store) as Arc<dyn StateStore>,
        Arc::clone(&prompts) as Arc<dyn BlockingPrompts>,
        Arc::clone(&notifications) as Arc<dyn NotificationBus>,
        broadcast,
    );

    Session {
        scheduler: TickScheduler::new(config, collaborators),
        store,
        prompts,
        notifications,
        winery,
    }
}

/// Read and execute commands until `quit` or end of input.
async fn run_console(session: &Session) -> Result<(), EngineError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Command::Tick(count) => {
                for _ in 0..count {
                    let outcome = session.scheduler.advance_tick().await;
                    log_outcome(&outcome);
                    if !outcome.is_advanced() {
                        break;
                    }
                }
            }
            Command::Status => log_status(session).await,
            Command::Prompt(text) => {
                session.prompts.push(text).await;
                info!(pending = session.prompts.len().await, "Prompt queued");
            }
            Command::FailWrites(fail) => {
                session.store.set_fail_writes(fail);
                warn!(fail, "Store write failure injection toggled");
            }
            Command::Quit => break,
            Command::Unknown(text) => warn!(input = %text, "Unknown command"),
        }
    }
    Ok(())
}

/// Log what a tick request did.
fn log_outcome(outcome: &TickOutcome) {
    match outcome {
        TickOutcome::Advanced(report) => info!(
            date = %report.date,
            season_changed = report.season_changed,
            year_changed = report.year_changed,
            economy = ?report.economy.map(|shift| shift.to),
            failed_effects = report.failed_effects().count(),
            achievement_sweep = report.achievement_sweep,
            state_synced = report.state_synced,
            "Week advanced"
        ),
        TickOutcome::Rejected => warn!("A tick is already running"),
        TickOutcome::Blocked => info!("Prompt resolved, advance again to continue"),
        TickOutcome::Failed => error!("Tick failed, see errors above"),
    }
}

/// Log the current game figures.
async fn log_status(session: &Session) {
    let state = session.store.snapshot().await;
    let winery = session.winery.summary().await;
    info!(
        date = %state.date,
        economy = %state.economy_phase,
        ticks = session.scheduler.ticks_advanced(),
        store_writes = session.store.writes(),
        pending_prompts = session.prompts.len().await,
        notifications = session.notifications.history().await.len(),
        "Game status"
    );
    info!(
        cash = winery.cash,
        loan_remaining = winery.loan_remaining,
        vine_age_years = winery.vine_age_years,
        bottles = winery.bottles,
        open_orders = winery.open_orders,
        contracts = winery.contracts,
        labor_weeks = winery.labor_weeks,
        prestige = winery.prestige,
        share_price_cents = winery.share_price_cents,
        board_snapshots = winery.board_snapshots,
        achievements = winery.achievements,
        "Winery status"
    );
}
