//! Keybind dispatch.
//!
//! A [`BindingSet`] holds one [`KeyChord`] per configured action and the
//! capture guard feeding them. Dropping the set releases the capture.

use crate::chord::KeyChord;
use crate::error::InputError;
use crate::facade::{TimerAction, TimerFacade};
use crate::input::{CaptureGuard, KeyEvent, KeyboardHook, Received};
use crate::keybinds::KeybindsFile;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// An action and the chord that triggers it.
#[derive(Debug, Clone)]
pub struct Binding {
    pub action: TimerAction,
    pub chord: KeyChord,
}

/// Chords built from a keybind file.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    bindings: Vec<Binding>,
}

impl Bindings {
    /// Build chords for every record. Records that cannot form a chord are skipped.
    pub fn from_file(file: &KeybindsFile) -> Self {
        let bindings = file
            .iter()
            .filter_map(|bound| match KeyChord::new(bound.keys.iter().copied()) {
                Ok(chord) => {
                    info!(action = %bound.action, %chord, "Bound keybind");
                    Some(Binding {
                        action: bound.action,
                        chord,
                    })
                }
                Err(e) => {
                    warn!(action = %bound.action, "Skipping keybind: {}", e);
                    None
                }
            })
            .collect();
        Self { bindings }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    /// Feed one event to every chord, returning the actions it activated
    /// in configuration order.
    pub fn handle(&mut self, event: &KeyEvent) -> Vec<TimerAction> {
        self.bindings
            .iter_mut()
            .filter_map(|binding| {
                if binding.chord.handle(event) {
                    debug!(action = %binding.action, chord = %binding.chord, "Keybind activated");
                    Some(binding.action)
                } else {
                    None
                }
            })
            .collect()
    }

    /// Forget all held keys, used after events were lost.
    pub fn release_all(&mut self) {
        self.bindings.iter_mut().for_each(|b| b.chord.release_all());
    }
}

/// Bindings attached to a live key source.
pub struct BindingSet {
    bindings: Bindings,
    guard: CaptureGuard,
}

impl BindingSet {
    /// Build bindings from `file` and start listening on `hook`.
    pub fn attach(file: &KeybindsFile, hook: &KeyboardHook) -> Result<Self, InputError> {
        let bindings = Bindings::from_file(file);
        let guard = hook.acquire()?;
        Ok(Self { bindings, guard })
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Wait for the next key event and return the actions it activated.
    /// Returns `None` once the key source is closed.
    pub async fn next_actions(&mut self) -> Option<Vec<TimerAction>> {
        loop {
            match self.guard.recv().await {
                Received::Event(event) => return Some(self.bindings.handle(&event)),
                Received::Lagged(missed) => {
                    warn!(missed, "Key events were dropped, releasing held keys");
                    self.bindings.release_all();
                }
                Received::Closed => return None,
            }
        }
    }

    /// Forward activated actions to `timer` until shutdown.
    pub async fn run(mut self, timer: TimerFacade, mut shutdown_rx: watch::Receiver<bool>) {
        info!(bindings = self.bindings.len(), "Keybind dispatcher started");
        loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Keybind dispatcher shutting down");
                        break;
                    }
                }
                actions = self.next_actions() => {
                    let Some(actions) = actions else {
                        info!("Key source closed");
                        break;
                    };
                    for action in actions {
                        if let Err(e) = timer.dispatch(action).await {
                            error!(%action, "Failed to dispatch keybind: {}", e);
                            return;
                        }
                    }
                }
            }
        }
    }
}
