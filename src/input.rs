//! Key event source.
//!
//! Capture is a shared, reference-counted capability. The first
//! [`CaptureGuard`] handed out by a [`KeyboardHook`] starts the backend,
//! and dropping the last one stops it. Every guard owns its own ordered
//! receiver so each consumer sees events in the order they were captured.

use crate::error::InputError;
use crate::keys::Key;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Buffered key events per receiver before a slow consumer starts lagging.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventKind {
    Down,
    Up,
}

/// A single key transition reported by the key source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub kind: KeyEventKind,
}

impl KeyEvent {
    pub fn down(key: Key) -> Self {
        Self {
            key,
            kind: KeyEventKind::Down,
        }
    }

    pub fn up(key: Key) -> Self {
        Self {
            key,
            kind: KeyEventKind::Up,
        }
    }
}

/// Handle given to a backend for publishing captured events.
#[derive(Debug, Clone)]
pub struct KeySink {
    sender: broadcast::Sender<KeyEvent>,
}

impl KeySink {
    /// Publish one event. Events with no listener are dropped.
    pub fn send(&self, event: KeyEvent) {
        let _ = self.sender.send(event);
    }

    pub fn press(&self, key: Key) {
        self.send(KeyEvent::down(key));
    }

    pub fn release(&self, key: Key) {
        self.send(KeyEvent::up(key));
    }
}

/// Platform-specific capture mechanism.
pub trait CaptureBackend: Send {
    /// Begin delivering events into `sink`.
    fn start(&mut self, sink: KeySink) -> Result<(), InputError>;

    /// Stop delivering events. Called once the last guard is dropped.
    fn stop(&mut self);
}

struct HookState {
    listeners: usize,
    backend: Box<dyn CaptureBackend>,
}

struct HookInner {
    sender: broadcast::Sender<KeyEvent>,
    state: Mutex<HookState>,
}

/// Shared key source. Cheap to clone.
#[derive(Clone)]
pub struct KeyboardHook {
    inner: Arc<HookInner>,
}

impl KeyboardHook {
    pub fn new(backend: impl CaptureBackend + 'static) -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(HookInner {
                sender,
                state: Mutex::new(HookState {
                    listeners: 0,
                    backend: Box::new(backend),
                }),
            }),
        }
    }

    /// Acquire a capture guard, starting the backend if this is the first.
    pub fn acquire(&self) -> Result<CaptureGuard, InputError> {
        let mut state = self.inner.state.lock().map_err(|_| InputError::LockPoisoned)?;

        // Subscribe before starting so no early event is missed.
        let receiver = self.inner.sender.subscribe();
        if state.listeners == 0 {
            info!("Hooking keyboard");
            state.backend.start(KeySink {
                sender: self.inner.sender.clone(),
            })?;
        }
        state.listeners += 1;
        debug!(listeners = state.listeners, "Capture guard acquired");

        Ok(CaptureGuard {
            inner: Arc::clone(&self.inner),
            receiver,
        })
    }

    /// Number of live capture guards.
    pub fn listeners(&self) -> usize {
        self.inner.state.lock().map(|s| s.listeners).unwrap_or(0)
    }

    pub fn is_capturing(&self) -> bool {
        self.listeners() > 0
    }
}

/// Outcome of waiting on a [`CaptureGuard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Received {
    Event(KeyEvent),
    /// Events were dropped because this consumer fell behind.
    Lagged(u64),
    /// The key source is gone.
    Closed,
}

/// Scoped capture subscription. Dropping it releases the capture.
pub struct CaptureGuard {
    inner: Arc<HookInner>,
    receiver: broadcast::Receiver<KeyEvent>,
}

impl CaptureGuard {
    /// Wait for the next event in capture order.
    pub async fn recv(&mut self) -> Received {
        match self.receiver.recv().await {
            Ok(event) => Received::Event(event),
            Err(broadcast::error::RecvError::Lagged(n)) => Received::Lagged(n),
            Err(broadcast::error::RecvError::Closed) => Received::Closed,
        }
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        if let Ok(mut state) = self.inner.state.lock() {
            state.listeners = state.listeners.saturating_sub(1);
            debug!(listeners = state.listeners, "Capture guard released");
            if state.listeners == 0 {
                info!("Unhooking keyboard");
                state.backend.stop();
            }
        }
    }
}

/// Parse one console line into key events.
///
/// Accepted forms are `down <key>`, `up <key>` and `tap <key>` (a press
/// followed by a release). Blank lines and `#` comments yield nothing.
pub fn parse_line(line: &str) -> Result<Vec<KeyEvent>, InputError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(Vec::new());
    }

    let mut parts = line.split_whitespace();
    let (Some(verb), Some(name), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(InputError::InvalidEvent(line.to_string()));
    };
    let key: Key = name.parse()?;

    match verb.to_ascii_lowercase().as_str() {
        "down" | "press" => Ok(vec![KeyEvent::down(key)]),
        "up" | "release" => Ok(vec![KeyEvent::up(key)]),
        "tap" => Ok(vec![KeyEvent::down(key), KeyEvent::up(key)]),
        _ => Err(InputError::InvalidEvent(line.to_string())),
    }
}

/// Reads key events from standard input, one per line.
///
/// Stands in for a system-wide keyboard hook; anything able to write
/// `down Subtract` style lines can drive the timer.
#[derive(Default)]
pub struct ConsoleBackend {
    task: Option<JoinHandle<()>>,
}

impl ConsoleBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CaptureBackend for ConsoleBackend {
    fn start(&mut self, sink: KeySink) -> Result<(), InputError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| InputError::CaptureFailed(e.to_string()))?;

        self.task = Some(runtime.spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => match parse_line(&line) {
                        Ok(events) => events.into_iter().for_each(|event| sink.send(event)),
                        Err(e) => warn!("Ignoring console input: {}", e),
                    },
                    Ok(None) => {
                        info!("Console input closed");
                        break;
                    }
                    Err(e) => {
                        warn!("Failed to read console input: {}", e);
                        break;
                    }
                }
            }
        }));
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
