//! Chord-style keybind matching.
//!
//! A chord is a set of keys that must all be held at the same time.
//! Order does not matter. Activation is edge-triggered: holding the
//! full chord down (including key auto-repeat) activates exactly once.

use crate::error::ChordError;
use crate::input::{KeyEvent, KeyEventKind};
use crate::keys::Key;
use std::fmt;
use tracing::trace;

/// Tracks the pressed state of a fixed set of keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChord {
    keys: Vec<Key>,
    pressed: Vec<bool>,
}

impl KeyChord {
    /// Create a chord from a non-empty set of distinct keys.
    pub fn new(keys: impl IntoIterator<Item = Key>) -> Result<Self, ChordError> {
        let keys: Vec<Key> = keys.into_iter().collect();
        if keys.is_empty() {
            return Err(ChordError::Empty);
        }
        for (i, key) in keys.iter().enumerate() {
            if keys[..i].contains(key) {
                return Err(ChordError::DuplicateKey(*key));
            }
        }

        let pressed = vec![false; keys.len()];
        Ok(Self { keys, pressed })
    }

    /// Keys making up this chord, in the order they were supplied.
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    fn index_of(&self, key: Key) -> Option<usize> {
        self.keys.iter().position(|k| *k == key)
    }

    /// Record the state of `key`.
    ///
    /// Returns `false` without doing anything if the key is not part of
    /// this chord, otherwise whether the recorded state changed.
    pub fn set_key(&mut self, key: Key, pressed: bool) -> bool {
        let Some(idx) = self.index_of(key) else {
            return false;
        };

        let changed = self.pressed[idx] != pressed;
        self.pressed[idx] = pressed;
        trace!(
            chord = %self,
            %key,
            pressed,
            held = self.held_count(),
            "Chord key state"
        );
        changed
    }

    /// Whether `key` is part of this chord and currently held.
    pub fn is_pressed(&self, key: Key) -> bool {
        self.index_of(key).map(|idx| self.pressed[idx]).unwrap_or(false)
    }

    /// True when every key of the chord is held.
    pub fn is_active(&self) -> bool {
        self.pressed.iter().all(|p| *p)
    }

    fn held_count(&self) -> usize {
        self.pressed.iter().filter(|p| **p).count()
    }

    /// Handle a key press. Returns `true` when this press completes the chord.
    pub fn key_down(&mut self, key: Key) -> bool {
        let was_active = self.is_active();
        self.set_key(key, true) && !was_active && self.is_active()
    }

    /// Handle a key release. Releases never activate.
    pub fn key_up(&mut self, key: Key) {
        self.set_key(key, false);
    }

    /// Handle one event from the key source. Returns `true` on activation.
    pub fn handle(&mut self, event: &KeyEvent) -> bool {
        match event.kind {
            KeyEventKind::Down => self.key_down(event.key),
            KeyEventKind::Up => {
                self.key_up(event.key);
                false
            }
        }
    }

    /// Forget every held key.
    pub fn release_all(&mut self) {
        self.pressed.iter_mut().for_each(|p| *p = false);
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                f.write_str("+")?;
            }
            write!(f, "{}", key)?;
        }
        Ok(())
    }
}
