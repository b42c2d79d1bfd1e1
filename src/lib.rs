//! Signal Booster - an adaptive rolling timer driven by key chords.
//!
//! The [`timer::RollingTimer`] learns the period of a recurring event from
//! the times it is reset. [`chord::KeyChord`] turns raw key transitions into
//! edge-triggered activations, and [`facade`] owns a timer on a tokio task
//! behind a cloneable handle.

pub mod bindings;
pub mod chord;
pub mod config;
pub mod error;
pub mod facade;
pub mod input;
pub mod keybinds;
pub mod keys;
pub mod logging;
pub mod timer;
