//! Timer facade.
//!
//! Maps the named user actions onto [`RollingTimer`] primitives and owns
//! the single task that drives a timer. All commands and ticks for one
//! timer are serialised through that task's `select!` loop, so a tick can
//! never race a reset, and once `stop`/`clear` return no further tick fires.

use crate::error::TimerError;
use crate::timer::{CancelAction, RollingTimer, RolloverAction, TimerSnapshot, TimerState};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Pending commands before callers start waiting on the service.
const COMMAND_CHANNEL_CAPACITY: usize = 32;
/// Buffered timer events per subscriber.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Actions a keybind can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerAction {
    StartOrReset,
    StopOrClear,
    Rollover,
    Cancel,
    Start,
    Stop,
    Reset,
    Clear,
}

impl TimerAction {
    pub const ALL: [TimerAction; 8] = [
        TimerAction::StartOrReset,
        TimerAction::StopOrClear,
        TimerAction::Rollover,
        TimerAction::Cancel,
        TimerAction::Start,
        TimerAction::Stop,
        TimerAction::Reset,
        TimerAction::Clear,
    ];

    /// Persisted name of the action.
    pub fn as_str(self) -> &'static str {
        match self {
            TimerAction::StartOrReset => "start_or_reset",
            TimerAction::StopOrClear => "stop_or_clear",
            TimerAction::Rollover => "rollover",
            TimerAction::Cancel => "cancel",
            TimerAction::Start => "start",
            TimerAction::Stop => "stop",
            TimerAction::Reset => "reset",
            TimerAction::Clear => "clear",
        }
    }

    /// The primitive this action would run against `timer`, without running it.
    pub fn preview(self, timer: &RollingTimer) -> ActionOutcome {
        let running = timer.is_running();
        match self {
            TimerAction::Rollover => timer.decide_rollover().into(),
            TimerAction::Cancel => timer.decide_cancel().into(),
            TimerAction::StartOrReset if running => ActionOutcome::Reset,
            TimerAction::StartOrReset | TimerAction::Start => start_outcome(timer, None),
            TimerAction::StopOrClear if running => ActionOutcome::Stop,
            TimerAction::StopOrClear | TimerAction::Clear => ActionOutcome::Clear,
            TimerAction::Stop | TimerAction::Reset if !running => ActionOutcome::Ignored,
            TimerAction::Stop => ActionOutcome::Stop,
            TimerAction::Reset => ActionOutcome::Reset,
        }
    }

    /// Run this action against `timer`.
    pub fn apply(self, timer: &mut RollingTimer, now: Instant) -> ActionOutcome {
        let outcome = self.preview(timer);
        match outcome {
            ActionOutcome::Start | ActionOutcome::Resume => timer.start_at(timer.duration_ms(), now),
            ActionOutcome::Reset => timer.reset_at(now),
            ActionOutcome::Stop => timer.stop(),
            ActionOutcome::Clear => timer.clear(),
            ActionOutcome::Ignored => debug!(action = %self, "Not running, action ignored"),
        }
        outcome
    }
}

/// `Resume` when a stopped timer continues at its stored estimate,
/// `Start` for every other start, including one given a fresh hint.
fn start_outcome(timer: &RollingTimer, hint_ms: Option<f64>) -> ActionOutcome {
    let hinted = hint_ms.is_some_and(|h| h.is_finite() && h > 0.0);
    if timer.state() == TimerState::Stopped && !hinted {
        ActionOutcome::Resume
    } else {
        ActionOutcome::Start
    }
}

impl fmt::Display for TimerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimerAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimerAction::ALL
            .iter()
            .copied()
            .find(|a| a.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "invalid action: {}, expected one of: {}",
                    s,
                    TimerAction::ALL.map(|a| a.as_str()).join(", ")
                )
            })
    }
}

/// The primitive operation an action resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    /// Started from scratch, from a hint, or restarted while running.
    Start,
    /// A stopped timer continued at its stored estimate.
    Resume,
    Reset,
    Stop,
    Clear,
    /// The action had nothing to do in the current state.
    Ignored,
}

impl From<RolloverAction> for ActionOutcome {
    fn from(action: RolloverAction) -> Self {
        match action {
            RolloverAction::Start => ActionOutcome::Start,
            RolloverAction::Resume => ActionOutcome::Resume,
            RolloverAction::Reset => ActionOutcome::Reset,
        }
    }
}

impl From<CancelAction> for ActionOutcome {
    fn from(action: CancelAction) -> Self {
        match action {
            CancelAction::Stop => ActionOutcome::Stop,
            CancelAction::Clear => ActionOutcome::Clear,
        }
    }
}

/// Notifications published by the timer service.
#[derive(Debug, Clone, PartialEq)]
pub enum TimerEvent {
    /// The current estimate elapsed while running.
    Tick(TimerSnapshot),
    /// An action was applied.
    Changed {
        action: TimerAction,
        outcome: ActionOutcome,
        snapshot: TimerSnapshot,
    },
}

enum Command {
    Apply {
        action: TimerAction,
        reply: oneshot::Sender<(ActionOutcome, TimerSnapshot)>,
    },
    Start {
        hint_ms: Option<f64>,
        reply: oneshot::Sender<TimerSnapshot>,
    },
    Preview {
        action: TimerAction,
        reply: oneshot::Sender<ActionOutcome>,
    },
    Snapshot {
        reply: oneshot::Sender<TimerSnapshot>,
    },
}

/// Handle to one timer owned by a [`TimerService`] task. Cheap to clone.
#[derive(Clone)]
pub struct TimerFacade {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<TimerEvent>,
}

impl TimerFacade {
    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, TimerError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| TimerError::ServiceClosed)?;
        response.await.map_err(|_| TimerError::ServiceClosed)
    }

    /// Apply a named action and return what it resolved to.
    pub async fn dispatch(&self, action: TimerAction) -> Result<(ActionOutcome, TimerSnapshot), TimerError> {
        self.request(|reply| Command::Apply { action, reply }).await
    }

    /// Start with an explicit duration hint in milliseconds.
    pub async fn start(&self, hint_ms: Option<f64>) -> Result<TimerSnapshot, TimerError> {
        self.request(|reply| Command::Start { hint_ms, reply }).await
    }

    pub async fn rollover(&self) -> Result<TimerSnapshot, TimerError> {
        self.dispatch(TimerAction::Rollover).await.map(|(_, s)| s)
    }

    pub async fn cancel(&self) -> Result<TimerSnapshot, TimerError> {
        self.dispatch(TimerAction::Cancel).await.map(|(_, s)| s)
    }

    pub async fn decide_rollover(&self) -> Result<RolloverAction, TimerError> {
        self.snapshot().await.map(|s| s.rollover)
    }

    pub async fn decide_cancel(&self) -> Result<CancelAction, TimerError> {
        self.snapshot().await.map(|s| s.cancel)
    }

    /// What `action` would do right now.
    pub async fn preview(&self, action: TimerAction) -> Result<ActionOutcome, TimerError> {
        self.request(|reply| Command::Preview { action, reply }).await
    }

    pub async fn snapshot(&self) -> Result<TimerSnapshot, TimerError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.events.subscribe()
    }
}

/// Task owning a [`RollingTimer`] and its periodic tick.
pub struct TimerService {
    timer: RollingTimer,
    commands: mpsc::Receiver<Command>,
    events: broadcast::Sender<TimerEvent>,
}

impl TimerService {
    /// Create a service and the facade that drives it.
    pub fn new(timer: RollingTimer) -> (Self, TimerFacade) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let facade = TimerFacade {
            commands: command_tx,
            events: event_tx.clone(),
        };
        let service = Self {
            timer,
            commands: command_rx,
            events: event_tx,
        };
        (service, facade)
    }

    /// Spawn the service onto the current runtime.
    pub fn spawn(timer: RollingTimer, shutdown_rx: watch::Receiver<bool>) -> (TimerFacade, JoinHandle<()>) {
        let (service, facade) = Self::new(timer);
        let handle = tokio::spawn(service.run(shutdown_rx));
        (facade, handle)
    }

    /// Run until shutdown is signalled or every facade is dropped.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        info!("Timer service started");
        loop {
            // Recomputed every pass, so any command that re-arms or disarms
            // the tick replaces the pending deadline before it can fire.
            let deadline = self.timer.next_tick_at();

            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Timer service shutting down");
                        break;
                    }
                }
                command = self.commands.recv() => {
                    match command {
                        Some(command) => self.handle(command),
                        None => {
                            info!("All timer handles dropped, stopping service");
                            break;
                        }
                    }
                }
                _ = wait_until(deadline) => {
                    let now = Instant::now();
                    if self.timer.tick_at(now) {
                        info!(timer = %self.timer, "Tick");
                        let _ = self.events.send(TimerEvent::Tick(self.timer.snapshot_at(now)));
                    }
                }
            }
        }
    }

    fn handle(&mut self, command: Command) {
        let now = Instant::now();
        match command {
            Command::Apply { action, reply } => {
                let outcome = action.apply(&mut self.timer, now);
                let snapshot = self.timer.snapshot_at(now);
                info!(%action, ?outcome, timer = %self.timer, "Applied action");
                let _ = self.events.send(TimerEvent::Changed {
                    action,
                    outcome,
                    snapshot: snapshot.clone(),
                });
                if reply.send((outcome, snapshot)).is_err() {
                    warn!(%action, "Caller went away before the action completed");
                }
            }
            Command::Start { hint_ms, reply } => {
                let outcome = start_outcome(&self.timer, hint_ms);
                self.timer.start_at(hint_ms, now);
                let snapshot = self.timer.snapshot_at(now);
                let _ = self.events.send(TimerEvent::Changed {
                    action: TimerAction::Start,
                    outcome,
                    snapshot: snapshot.clone(),
                });
                let _ = reply.send(snapshot);
            }
            Command::Preview { action, reply } => {
                let _ = reply.send(action.preview(&self.timer));
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.timer.snapshot_at(now));
            }
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
