//! Exam countdown state machine.

use crate::schedule::IntervalTimer;
use std::time::Duration;

/// Default warning threshold in seconds.
pub const DEFAULT_WARNING_THRESHOLD_SECS: u64 = 300;

/// Countdown phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Running,
    /// Entered once remaining time falls to the warning threshold; never
    /// exited except into `Expired`.
    Warning,
    /// Terminal. Remaining time stays at zero and ticks are ignored.
    Expired,
}

/// Observable transition produced by a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockTransition {
    EnteredWarning,
    Expired,
}

/// Countdown clock for one exam sitting.
///
/// Driven by [`advance`](ExamClock::advance) with simulated durations; each
/// accumulated whole second produces one tick. On reaching zero the clock
/// fires its expiry hook exactly once and goes terminal.
/// [`stop`](ExamClock::stop) cancels ticking in any state so a torn-down
/// view can never receive a late expiry.
pub struct ExamClock {
    remaining_secs: u64,
    state: ClockState,
    warning_threshold_secs: u64,
    ticker: IntervalTimer,
    expiry_hook: Option<Box<dyn FnOnce() + Send>>,
    stopped: bool,
}

impl ExamClock {
    /// Create a clock with the exam's duration in seconds.
    pub fn new(duration_secs: u64) -> Self {
        let mut clock = Self {
            remaining_secs: duration_secs,
            state: ClockState::Running,
            warning_threshold_secs: DEFAULT_WARNING_THRESHOLD_SECS,
            ticker: IntervalTimer::new(Duration::from_secs(1)),
            expiry_hook: None,
            stopped: false,
        };
        clock.reclassify();
        clock
    }

    /// Override the warning threshold.
    pub fn with_warning_threshold(mut self, secs: u64) -> Self {
        self.warning_threshold_secs = secs;
        self.reclassify();
        self
    }

    /// Install a hook invoked exactly once when the countdown expires.
    pub fn on_expiry(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.expiry_hook = Some(Box::new(hook));
        self
    }

    /// Recompute the state from the remaining time without ticking. A clock
    /// constructed inside the threshold starts in `Warning`; one constructed
    /// at zero is already terminal (and never fires the hook).
    fn reclassify(&mut self) {
        self.state = if self.remaining_secs == 0 {
            ClockState::Expired
        } else if self.remaining_secs <= self.warning_threshold_secs {
            ClockState::Warning
        } else {
            ClockState::Running
        };
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_expired(&self) -> bool {
        self.state == ClockState::Expired
    }

    /// Stop ticking permanently (view teardown). A stopped clock ignores all
    /// further time and never fires the expiry hook.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Advance simulated time, ticking once per accumulated whole second.
    pub fn advance(&mut self, dt: Duration) -> Vec<ClockTransition> {
        let mut transitions = Vec::new();
        if self.stopped || self.state == ClockState::Expired {
            return transitions;
        }
        let ticks = self.ticker.advance(dt);
        for _ in 0..ticks {
            if let Some(transition) = self.tick() {
                transitions.push(transition);
            }
            if self.state == ClockState::Expired {
                break;
            }
        }
        transitions
    }

    /// Apply one second of countdown.
    pub fn tick(&mut self) -> Option<ClockTransition> {
        if self.stopped || self.state == ClockState::Expired {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.state = ClockState::Expired;
            if let Some(hook) = self.expiry_hook.take() {
                hook();
            }
            return Some(ClockTransition::Expired);
        }
        if self.state == ClockState::Running && self.remaining_secs <= self.warning_threshold_secs {
            self.state = ClockState::Warning;
            return Some(ClockTransition::EnteredWarning);
        }
        None
    }
}

/// Format remaining seconds for display (`m:ss`, or `h:mm:ss` from one hour).
pub fn format_remaining(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}
