//! Adaptive rolling timer.
//!
//! Tracks a recurring external event whose period is unknown and only
//! approximately periodic. Each time the event is observed the caller
//! calls [`RollingTimer::reset`], and the timer folds the observed
//! interval into a running average of the period.
//!
//! ```text
//!            start()                 reset()
//!  Cleared ─────────► WaitingForFirstReset ─────► Running ◄──┐
//!     ▲                                          │   │  reset/tick
//!     │ clear()                          stop()  │   └───────┘
//!     └──────────────── Stopped ◄────────────────┘
//!                          │ start() resumes at the same estimate
//! ```
//!
//! The timer itself is a plain state machine with no threads. Every
//! operation has an `_at` variant taking an explicit instant; the tick
//! scheduler lives in [`crate::facade`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Observable state of a [`RollingTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    /// No estimate, not running.
    Cleared,
    /// Running, waiting for the first observed event to define the estimate.
    WaitingForFirstReset,
    /// Running and ticking at the current estimate.
    Running,
    /// Not running, estimate preserved.
    Stopped,
}

/// What [`RollingTimer::rollover`] does in the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolloverAction {
    Start,
    Resume,
    Reset,
}

/// What [`RollingTimer::cancel`] does in the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelAction {
    Stop,
    Clear,
}

/// Point-in-time view of a timer, with every derived quantity computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub state: TimerState,
    pub is_running: bool,
    /// Current estimate in milliseconds, `None` while unknown.
    pub duration_ms: Option<f64>,
    pub reset_count: u32,
    pub elapsed_ms: f64,
    pub remaining_ms: f64,
    /// Fraction of the period left, 0.0 to 1.0.
    pub percent_remaining: f64,
    pub rollover: RolloverAction,
    pub cancel: CancelAction,
}

/// Rolling timer with a self-refining duration estimate.
#[derive(Debug, Clone)]
pub struct RollingTimer {
    duration_ms: Option<f64>,
    reset_count: u32,
    running: bool,
    last_tick: Option<Instant>,
    start_time: Option<Instant>,
    epoch: u64,
}

impl Default for RollingTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl RollingTimer {
    /// Create a cleared timer with no estimate.
    pub fn new() -> Self {
        Self {
            duration_ms: None,
            reset_count: 0,
            running: false,
            last_tick: None,
            start_time: None,
            epoch: 0,
        }
    }

    /// Create a stopped timer seeded with an estimate, so the first start
    /// resumes at `duration_ms` instead of waiting for a reset.
    /// Non-positive or non-finite values give a cleared timer.
    pub fn with_duration(duration_ms: f64) -> Self {
        Self {
            duration_ms: Some(duration_ms).filter(|d| d.is_finite() && *d > 0.0),
            ..Self::new()
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Current period estimate in milliseconds.
    pub fn duration_ms(&self) -> Option<f64> {
        self.duration_ms
    }

    /// Number of observed intervals folded into the estimate.
    pub fn reset_count(&self) -> u32 {
        self.reset_count
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Generation of the armed tick. Changes whenever the tick is armed,
    /// re-armed or disarmed; a deadline computed under an older epoch is stale.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn state(&self) -> TimerState {
        match (self.running, self.duration_ms.is_some()) {
            (true, true) => TimerState::Running,
            (true, false) => TimerState::WaitingForFirstReset,
            (false, true) => TimerState::Stopped,
            (false, false) => TimerState::Cleared,
        }
    }

    fn reference(&self) -> Option<Instant> {
        self.start_time.or(self.last_tick)
    }

    /// Milliseconds since the last tick, reset or start.
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms_at(Instant::now())
    }

    pub fn elapsed_ms_at(&self, now: Instant) -> f64 {
        if self.duration_ms.is_none() && self.start_time.is_none() {
            return 0.0;
        }
        self.reference()
            .map(|reference| millis(now.saturating_duration_since(reference)))
            .unwrap_or(0.0)
    }

    /// Milliseconds until the next expected event, 0 while unknown.
    pub fn remaining_ms(&self) -> f64 {
        self.remaining_ms_at(Instant::now())
    }

    pub fn remaining_ms_at(&self, now: Instant) -> f64 {
        match self.duration_ms {
            Some(duration) => (duration - self.elapsed_ms_at(now)).max(0.0),
            None => 0.0,
        }
    }

    /// Fraction of the period remaining, 0 while unknown.
    pub fn percent_remaining_at(&self, now: Instant) -> f64 {
        match self.duration_ms {
            Some(duration) => self.remaining_ms_at(now) / duration,
            None => 0.0,
        }
    }

    /// When the armed periodic tick is next due, if one is armed.
    /// An estimate too large to land on the clock arms no tick.
    pub fn next_tick_at(&self) -> Option<Instant> {
        if !self.running {
            return None;
        }
        let duration = self.duration_ms?;
        let last_tick = self.last_tick?;
        let period = Duration::try_from_secs_f64(duration / 1000.0).ok()?;
        last_tick.checked_add(period)
    }

    /// Which branch [`rollover`](Self::rollover) would take, without acting.
    pub fn decide_rollover(&self) -> RolloverAction {
        if self.duration_ms.is_none() && !self.running {
            RolloverAction::Start
        } else if !self.running {
            RolloverAction::Resume
        } else {
            RolloverAction::Reset
        }
    }

    /// Which branch [`cancel`](Self::cancel) would take, without acting.
    pub fn decide_cancel(&self) -> CancelAction {
        if self.running {
            CancelAction::Stop
        } else {
            CancelAction::Clear
        }
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        self.snapshot_at(Instant::now())
    }

    pub fn snapshot_at(&self, now: Instant) -> TimerSnapshot {
        TimerSnapshot {
            state: self.state(),
            is_running: self.running,
            duration_ms: self.duration_ms,
            reset_count: self.reset_count,
            elapsed_ms: self.elapsed_ms_at(now),
            remaining_ms: self.remaining_ms_at(now),
            percent_remaining: self.percent_remaining_at(now),
            rollover: self.decide_rollover(),
            cancel: self.decide_cancel(),
        }
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Start the timer, optionally overriding the estimate with `hint_ms`.
    pub fn start(&mut self, hint_ms: Option<f64>) {
        self.start_at(hint_ms, Instant::now());
    }

    pub fn start_at(&mut self, hint_ms: Option<f64>, now: Instant) {
        if let Some(hint) = hint_ms.filter(|h| h.is_finite() && *h > 0.0) {
            self.duration_ms = Some(hint);
        }

        self.running = true;
        self.reset_count = 0;
        self.epoch += 1;

        match self.duration_ms {
            Some(duration) => {
                self.start_time = None;
                self.last_tick = Some(now);
                info!(duration_ms = duration, "Timer started");
            }
            None => {
                self.start_time = Some(now);
                info!("No duration set, waiting for first reset");
            }
        }
    }

    /// Stop ticking. The estimate and reset count are kept.
    pub fn stop(&mut self) {
        if !self.running {
            debug!("Not running, ignoring stop");
            return;
        }
        self.running = false;
        self.epoch += 1;
        info!(duration_ms = ?self.duration_ms, reset_count = self.reset_count, "Timer stopped");
    }

    /// Stop and forget the estimate entirely.
    pub fn clear(&mut self) {
        self.running = false;
        self.duration_ms = None;
        self.start_time = None;
        self.reset_count = 0;
        self.epoch += 1;
        info!("Timer cleared");
    }

    /// Report that the tracked event just happened.
    pub fn reset(&mut self) {
        self.reset_at(Instant::now());
    }

    pub fn reset_at(&mut self, now: Instant) {
        if !self.running {
            debug!("Not running, ignoring reset");
            return;
        }

        let reference = self.start_time.take().or(self.last_tick);
        let elapsed = reference
            .map(|r| millis(now.saturating_duration_since(r)))
            .unwrap_or(0.0);

        match self.duration_ms {
            None if elapsed <= 0.0 => {
                // A zero-length first sample carries no information.
                self.start_time = Some(now);
                debug!("Zero-length first sample discarded");
                return;
            }
            None => {
                self.duration_ms = Some(elapsed);
                info!(duration_ms = elapsed, "Duration was unknown, set from first sample");
            }
            Some(duration) => {
                let blended = blend(duration, self.reset_count, elapsed);
                self.duration_ms = Some(blended);
                info!(
                    previous_ms = duration,
                    duration_ms = blended,
                    elapsed_ms = elapsed,
                    reset_count = self.reset_count + 1,
                    "Adjusted duration"
                );
            }
        }

        self.last_tick = Some(now);
        self.reset_count += 1;
        self.epoch += 1;
    }

    /// Record a periodic tick. Returns `false` when no tick is armed.
    pub fn tick_at(&mut self, now: Instant) -> bool {
        if !self.running || self.duration_ms.is_none() {
            return false;
        }
        self.last_tick = Some(now);
        true
    }

    /// Start if cleared, resume if stopped, reset if running.
    pub fn rollover(&mut self) -> RolloverAction {
        self.rollover_at(Instant::now())
    }

    pub fn rollover_at(&mut self, now: Instant) -> RolloverAction {
        let action = self.decide_rollover();
        match action {
            RolloverAction::Start | RolloverAction::Resume => self.start_at(None, now),
            RolloverAction::Reset => self.reset_at(now),
        }
        action
    }

    /// Stop if running, otherwise clear.
    pub fn cancel(&mut self) -> CancelAction {
        let action = self.decide_cancel();
        match action {
            CancelAction::Stop => self.stop(),
            CancelAction::Clear => self.clear(),
        }
        action
    }
}

/// Fold one observed interval into the running average.
///
/// A reset that lands nearer the previous boundary than the next one is
/// taken as a full cycle plus slack (`duration + elapsed`); otherwise the
/// raw interval is used. Ties take the raw interval.
pub fn blend(duration: f64, reset_count: u32, elapsed: f64) -> f64 {
    let elapsed = elapsed.max(0.0);
    let n = f64::from(reset_count);
    let remaining = duration - elapsed;
    let observed = if elapsed < remaining {
        duration + elapsed
    } else {
        elapsed
    };
    (duration * n + observed) / (n + 1.0)
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

impl fmt::Display for RollingTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{Duration: {}, ResetCount: {}, IsRunning: {}, Elapsed: {:.0}}}",
            self.duration_ms
                .map(|d| format!("{:.0}ms", d))
                .unwrap_or_else(|| "unknown".to_string()),
            self.reset_count,
            self.running,
            self.elapsed_ms()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    fn assert_due(actual: Option<Instant>, expected: Instant) {
        let actual = actual.expect("tick should be armed");
        let skew = if actual > expected { actual - expected } else { expected - actual };
        assert!(skew < Duration::from_micros(1), "deadline off by {skew:?}");
    }

    /// A timer started with a 300ms hint and no refinements.
    fn running_300(t0: Instant) -> RollingTimer {
        let mut timer = RollingTimer::new();
        timer.start_at(Some(300.0), t0);
        timer
    }

    #[test]
    fn test_seeded_timer_resumes_at_estimate() {
        let t0 = Instant::now();
        let mut timer = RollingTimer::with_duration(250.0);
        assert_eq!(timer.state(), TimerState::Stopped);
        assert_eq!(timer.decide_rollover(), RolloverAction::Resume);

        assert_eq!(timer.rollover_at(t0), RolloverAction::Resume);
        assert_eq!(timer.state(), TimerState::Running);
        assert_due(timer.next_tick_at(), t0 + ms(250));

        assert_eq!(RollingTimer::with_duration(0.0).state(), TimerState::Cleared);
        assert_eq!(RollingTimer::with_duration(f64::NAN).state(), TimerState::Cleared);
    }

    #[test]
    fn test_unrepresentable_estimate_arms_no_tick() {
        let t0 = Instant::now();
        let mut timer = RollingTimer::new();
        timer.start_at(Some(1e22), t0);

        assert_eq!(timer.state(), TimerState::Running);
        assert_eq!(timer.duration_ms(), Some(1e22));
        assert_eq!(timer.next_tick_at(), None);
        assert!(timer.remaining_ms_at(t0 + ms(10)).is_finite());

        timer.start_at(Some(f64::MAX), t0);
        assert_eq!(timer.next_tick_at(), None);
    }

    #[test]
    fn test_new_timer_is_cleared() {
        let timer = RollingTimer::new();
        assert_eq!(timer.state(), TimerState::Cleared);
        assert_eq!(timer.duration_ms(), None);
        assert_eq!(timer.reset_count(), 0);
        assert_eq!(timer.elapsed_ms(), 0.0);
        assert_eq!(timer.remaining_ms(), 0.0);
        assert!(timer.next_tick_at().is_none());
    }

    #[test]
    fn test_clear_then_start_waits_for_first_reset() {
        let t0 = Instant::now();
        let mut timer = running_300(t0);
        timer.clear();
        timer.start_at(None, t0 + ms(10));
        assert_eq!(timer.state(), TimerState::WaitingForFirstReset);
        assert!(timer.next_tick_at().is_none());
    }

    #[test]
    fn test_first_reset_defines_duration() {
        let t0 = Instant::now();
        let mut timer = RollingTimer::new();
        timer.start_at(None, t0);
        assert_close(timer.elapsed_ms_at(t0 + ms(1234)), 1234.0);

        timer.reset_at(t0 + ms(1234));
        assert_close(timer.duration_ms().unwrap(), 1234.0);
        assert_eq!(timer.reset_count(), 1);
        assert_eq!(timer.state(), TimerState::Running);
        assert_due(timer.next_tick_at(), t0 + ms(2468));
    }

    #[test]
    fn test_zero_length_first_sample_is_discarded() {
        let t0 = Instant::now();
        let mut timer = RollingTimer::new();
        timer.start_at(None, t0);
        timer.reset_at(t0);
        assert_eq!(timer.duration_ms(), None);
        assert_eq!(timer.reset_count(), 0);
        assert_eq!(timer.state(), TimerState::WaitingForFirstReset);

        timer.reset_at(t0 + ms(500));
        assert_close(timer.duration_ms().unwrap(), 500.0);
    }

    #[test]
    fn test_reset_near_previous_boundary_extends_cycle() {
        let t0 = Instant::now();
        let mut timer = running_300(t0);
        timer.reset_at(t0 + ms(100));
        assert_close(timer.duration_ms().unwrap(), 400.0);
        assert_eq!(timer.reset_count(), 1);
    }

    #[test]
    fn test_reset_near_next_boundary_uses_raw_interval() {
        let t0 = Instant::now();
        let mut timer = running_300(t0);
        timer.reset_at(t0 + ms(250));
        assert_close(timer.duration_ms().unwrap(), 250.0);
    }

    #[test]
    fn test_reset_tie_uses_raw_interval() {
        let t0 = Instant::now();
        let mut timer = running_300(t0);
        timer.reset_at(t0 + ms(150));
        assert_close(timer.duration_ms().unwrap(), 150.0);
    }

    #[test]
    fn test_reset_averages_with_history() {
        let t0 = Instant::now();
        let mut timer = running_300(t0);
        timer.reset_at(t0 + ms(250));
        // duration 250, n = 1; 200 is nearer the next boundary
        timer.reset_at(t0 + ms(450));
        assert_close(timer.duration_ms().unwrap(), (250.0 + 200.0) / 2.0);
        assert_eq!(timer.reset_count(), 2);
    }

    #[test]
    fn test_reset_rearms_from_now() {
        let t0 = Instant::now();
        let mut timer = running_300(t0);
        let epoch = timer.epoch();
        timer.reset_at(t0 + ms(250));
        assert_ne!(timer.epoch(), epoch);
        assert_due(timer.next_tick_at(), t0 + ms(500));
    }

    #[test]
    fn test_reset_while_not_running_is_noop() {
        let t0 = Instant::now();
        let mut timer = running_300(t0);
        timer.stop();
        let epoch = timer.epoch();
        timer.reset_at(t0 + ms(100));
        assert_close(timer.duration_ms().unwrap(), 300.0);
        assert_eq!(timer.reset_count(), 0);
        assert_eq!(timer.epoch(), epoch);
    }

    #[test]
    fn test_stop_preserves_estimate_and_disarms() {
        let t0 = Instant::now();
        let mut timer = running_300(t0);
        timer.reset_at(t0 + ms(250));
        timer.stop();
        assert_eq!(timer.state(), TimerState::Stopped);
        assert_eq!(timer.reset_count(), 1);
        assert!(timer.next_tick_at().is_none());
        assert!(!timer.tick_at(t0 + ms(600)));
    }

    #[test]
    fn test_stop_then_start_resumes_same_duration() {
        let t0 = Instant::now();
        let mut timer = running_300(t0);
        timer.reset_at(t0 + ms(250));
        timer.stop();
        timer.start_at(None, t0 + ms(1000));
        assert_eq!(timer.state(), TimerState::Running);
        assert_close(timer.duration_ms().unwrap(), 250.0);
        assert_eq!(timer.reset_count(), 0);
        assert_due(timer.next_tick_at(), t0 + ms(1250));
    }

    #[test]
    fn test_hint_overrides_estimate() {
        let t0 = Instant::now();
        let mut timer = running_300(t0);
        timer.reset_at(t0 + ms(250));
        timer.start_at(Some(1000.0), t0 + ms(300));
        assert_close(timer.duration_ms().unwrap(), 1000.0);
        assert_eq!(timer.reset_count(), 0);
    }

    #[test]
    fn test_non_positive_hint_is_ignored() {
        let t0 = Instant::now();
        let mut timer = RollingTimer::new();
        timer.start_at(Some(-5.0), t0);
        assert_eq!(timer.state(), TimerState::WaitingForFirstReset);
        timer.start_at(Some(f64::NAN), t0);
        assert_eq!(timer.duration_ms(), None);
    }

    #[test]
    fn test_start_with_estimate_retires_start_time() {
        let t0 = Instant::now();
        let mut timer = RollingTimer::new();
        timer.start_at(None, t0);
        timer.stop();
        timer.start_at(Some(1000.0), t0 + ms(5000));
        assert_close(timer.elapsed_ms_at(t0 + ms(5100)), 100.0);
    }

    #[test]
    fn test_tick_updates_reference() {
        let t0 = Instant::now();
        let mut timer = running_300(t0);
        assert!(timer.tick_at(t0 + ms(300)));
        assert_close(timer.elapsed_ms_at(t0 + ms(350)), 50.0);
        assert_close(timer.remaining_ms_at(t0 + ms(350)), 250.0);
        assert_due(timer.next_tick_at(), t0 + ms(600));
    }

    #[test]
    fn test_percent_remaining() {
        let t0 = Instant::now();
        let timer = running_300(t0);
        assert_close(timer.percent_remaining_at(t0 + ms(75)), 0.75);
        assert_eq!(RollingTimer::new().percent_remaining_at(t0), 0.0);
    }

    #[test]
    fn test_rollover_branches() {
        let t0 = Instant::now();
        let mut timer = RollingTimer::new();

        assert_eq!(timer.decide_rollover(), RolloverAction::Start);
        assert_eq!(timer.rollover_at(t0), RolloverAction::Start);
        assert_eq!(timer.state(), TimerState::WaitingForFirstReset);

        assert_eq!(timer.decide_rollover(), RolloverAction::Reset);
        assert_eq!(timer.rollover_at(t0 + ms(400)), RolloverAction::Reset);
        assert_close(timer.duration_ms().unwrap(), 400.0);

        timer.stop();
        assert_eq!(timer.decide_rollover(), RolloverAction::Resume);
        assert_eq!(timer.rollover_at(t0 + ms(900)), RolloverAction::Resume);
        assert_eq!(timer.state(), TimerState::Running);
        assert_close(timer.duration_ms().unwrap(), 400.0);
    }

    #[test]
    fn test_cancel_branches() {
        let t0 = Instant::now();
        let mut timer = running_300(t0);
        timer.reset_at(t0 + ms(250));

        assert_eq!(timer.decide_cancel(), CancelAction::Stop);
        assert_eq!(timer.cancel(), CancelAction::Stop);
        assert_eq!(timer.reset_count(), 1);
        assert!(timer.duration_ms().is_some());

        assert_eq!(timer.decide_cancel(), CancelAction::Clear);
        assert_eq!(timer.cancel(), CancelAction::Clear);
        assert_eq!(timer.state(), TimerState::Cleared);
        assert_eq!(timer.reset_count(), 0);

        assert_eq!(timer.cancel(), CancelAction::Clear);
        assert_eq!(timer.state(), TimerState::Cleared);
    }

    #[test]
    fn test_snapshot_reflects_decisions() {
        let t0 = Instant::now();
        let timer = running_300(t0);
        let snapshot = timer.snapshot_at(t0 + ms(100));
        assert_eq!(snapshot.state, TimerState::Running);
        assert_eq!(snapshot.rollover, RolloverAction::Reset);
        assert_eq!(snapshot.cancel, CancelAction::Stop);
        assert_close(snapshot.remaining_ms, 200.0);
    }

    #[test]
    fn test_display() {
        let t0 = Instant::now();
        let text = running_300(t0).to_string();
        assert!(text.contains("Duration: 300ms"));
        assert!(text.contains("IsRunning: true"));
        assert!(RollingTimer::new().to_string().contains("unknown"));
    }

    #[test]
    fn test_blend_clamps_negative_elapsed() {
        assert_close(blend(300.0, 0, -50.0), 300.0);
    }

    /// Timer built by any sequence of primitive operations.
    fn op_strategy() -> impl Strategy<Value = (u8, u64)> {
        (0u8..5, 0u64..2_000)
    }

    fn apply(timer: &mut RollingTimer, op: u8, at: Instant) {
        match op {
            0 => timer.start_at(None, at),
            1 => timer.reset_at(at),
            2 => timer.stop(),
            3 => timer.clear(),
            _ => {
                timer.tick_at(at);
            }
        }
    }

    proptest! {
        /// The running average stays between the smallest and largest
        /// interval it could have been fed.
        #[test]
        fn prop_blend_is_bounded(
            duration in 1.0f64..1_000_000.0,
            reset_count in 0u32..1000,
            elapsed in 0.0f64..2_000_000.0,
        ) {
            let blended = blend(duration, reset_count, elapsed);
            let observed = if elapsed < duration - elapsed { duration + elapsed } else { elapsed };
            let lo = duration.min(observed);
            let hi = duration.max(observed);
            prop_assert!(blended > 0.0);
            prop_assert!(blended >= lo - 1e-6 && blended <= hi + 1e-6);
        }

        /// Decisions predict the branch taken, and never mutate.
        #[test]
        fn prop_decisions_predict_actions(
            ops in prop::collection::vec(op_strategy(), 0..30),
        ) {
            let t0 = Instant::now();
            let mut timer = RollingTimer::new();
            let mut at = t0;
            for (op, gap) in ops {
                at += Duration::from_millis(gap);
                apply(&mut timer, op, at);
            }

            let before = timer.snapshot_at(at);
            let predicted_rollover = timer.decide_rollover();
            let predicted_cancel = timer.decide_cancel();
            prop_assert_eq!(timer.snapshot_at(at), before);

            let mut rolled = timer.clone();
            prop_assert_eq!(rolled.rollover_at(at + Duration::from_millis(10)), predicted_rollover);
            let mut cancelled = timer.clone();
            prop_assert_eq!(cancelled.cancel(), predicted_cancel);
        }

        /// Duration is never non-positive once known, and the reset count
        /// is zero whenever the estimate is unknown.
        #[test]
        fn prop_estimate_invariants(
            ops in prop::collection::vec(op_strategy(), 0..50),
        ) {
            let mut timer = RollingTimer::new();
            let mut at = Instant::now();
            for (op, gap) in ops {
                at += Duration::from_millis(gap);
                apply(&mut timer, op, at);
                if let Some(d) = timer.duration_ms() {
                    prop_assert!(d > 0.0);
                } else {
                    prop_assert_eq!(timer.reset_count(), 0);
                }
                prop_assert!(timer.remaining_ms_at(at) >= 0.0);
            }
        }
    }
}
