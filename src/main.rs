//! Signal Booster - keyboard-driven adaptive rolling timer.
//!
//! Reads key events, matches them against the configured keybinds and
//! drives a rolling timer that learns the period of a recurring event.

use signal_booster::bindings::BindingSet;
use signal_booster::config::ConfigManager;
use signal_booster::error::AppError;
use signal_booster::facade::{TimerEvent, TimerFacade, TimerService};
use signal_booster::input::{ConsoleBackend, KeyboardHook};
use signal_booster::keybinds::KeybindsFile;
use signal_booster::logging;
use signal_booster::timer::RollingTimer;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Graceful shutdown timeout in seconds
const SHUTDOWN_TIMEOUT_SECS: u64 = 2;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _log_guard = logging::init_logging().map_err(|e| {
        eprintln!("Failed to initialize logging: {}", e);
        e
    })?;

    info!("Signal Booster starting...");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| AppError::Runtime(format!("Failed to build tokio runtime: {}", e)))?;
    let result = runtime.block_on(run_app());
    // Console input sits in a blocking read that only returns on the next line.
    runtime.shutdown_timeout(Duration::from_secs(SHUTDOWN_TIMEOUT_SECS));

    match &result {
        Ok(()) => info!("Signal Booster shut down gracefully"),
        Err(e) => error!("Signal Booster error: {}", e),
    }

    Ok(result?)
}

async fn run_app() -> Result<(), AppError> {
    let config_path = ConfigManager::default_path();
    let config_manager = ConfigManager::load_or_default(&config_path)?;
    info!("Configuration loaded from {:?}", config_path);
    let config = config_manager.get();

    let keybinds_path = config.keybinds_path();
    let keybinds = KeybindsFile::load_or_default(&keybinds_path);
    if !keybinds_path.exists() {
        if let Err(e) = keybinds.save(&keybinds_path) {
            warn!("Failed to write default keybinds to {:?}: {}", keybinds_path, e);
        }
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = setup_signal_handlers(shutdown_tx_clone).await {
            error!("Signal handler error: {}", e);
        }
    });

    let timer = match config.initial_duration_ms {
        Some(hint) => {
            info!(duration_ms = hint, "Seeding timer with configured duration");
            RollingTimer::with_duration(hint)
        }
        None => RollingTimer::new(),
    };
    let (facade, timer_handle) = TimerService::spawn(timer, shutdown_rx.clone());

    let status_interval = Duration::from_millis(config.status_interval_ms);
    let status_handle = tokio::spawn(run_status_reporter(
        facade.clone(),
        status_interval,
        shutdown_rx.clone(),
    ));

    let hook = KeyboardHook::new(ConsoleBackend::new());
    let bindings = BindingSet::attach(&keybinds, &hook)?;
    if bindings.bindings().is_empty() {
        warn!("No usable keybinds, the timer can only be driven programmatically");
    }
    let dispatch_handle = tokio::spawn(bindings.run(facade.clone(), shutdown_rx.clone()));

    info!("Signal Booster running, reading key events from stdin");

    let mut shutdown_rx_main = shutdown_rx.clone();
    shutdown_rx_main.changed().await.ok();

    info!("Shutdown signal received, stopping tasks...");

    let shutdown_timeout = Duration::from_secs(SHUTDOWN_TIMEOUT_SECS);
    let _ = tokio::time::timeout(shutdown_timeout, async {
        let _ = tokio::join!(dispatch_handle, status_handle, timer_handle);
    })
    .await;

    info!("All tasks stopped");
    Ok(())
}

/// Set up signal handlers for graceful shutdown.
#[cfg(unix)]
async fn setup_signal_handlers(
    shutdown_tx: watch::Sender<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT");
        }
    }

    let _ = shutdown_tx.send(true);
    Ok(())
}

#[cfg(not(unix))]
async fn setup_signal_handlers(
    shutdown_tx: watch::Sender<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C");
    let _ = shutdown_tx.send(true);
    Ok(())
}

/// Trace timer events and log the remaining time every `interval` while running.
async fn run_status_reporter(
    timer: TimerFacade,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut events = timer.subscribe();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    info!("Status reporter shutting down");
                    break;
                }
            }
            event = events.recv() => match event {
                Ok(TimerEvent::Changed { action, outcome, snapshot }) => {
                    debug!(
                        %action,
                        ?outcome,
                        state = ?snapshot.state,
                        duration_ms = ?snapshot.duration_ms,
                        reset_count = snapshot.reset_count,
                        "Timer action applied"
                    );
                }
                Ok(TimerEvent::Tick(snapshot)) => {
                    debug!(
                        duration_ms = ?snapshot.duration_ms,
                        reset_count = snapshot.reset_count,
                        "Timer period elapsed"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Status reporter fell behind on timer events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = ticker.tick() => match timer.snapshot().await {
                Ok(snapshot) if snapshot.is_running => {
                    info!(
                        state = ?snapshot.state,
                        elapsed_ms = snapshot.elapsed_ms,
                        remaining_ms = snapshot.remaining_ms,
                        percent_remaining = snapshot.percent_remaining,
                        "Timer status"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Status reporter stopping: {}", e);
                    break;
                }
            },
        }
    }
}
