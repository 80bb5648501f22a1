//! Per-request timeout state machine.
//!
//! [`TimeoutManager`] never touches a clock or spawns a timer itself. Callers
//! pass the current instant in and schedule the returned [`TimerArm`]; when the
//! timer elapses they call [`TimeoutManager::fire`] with the arm's generation.
//! Re-arming bumps the generation so a timer scheduled earlier can no longer
//! fire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// How a request's timeout is measured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum TimeoutMode {
    /// No timeout
    #[default]
    Never,
    /// Countdown from activation, disarmed by the first accepted value
    Delayed(Duration),
    /// Countdown restarted by every accepted value
    Idle(Duration),
    /// Fixed wall-clock deadline
    Absolute(DateTime<Utc>),
}

impl TimeoutMode {
    /// `true` for [`TimeoutMode::Never`].
    #[must_use]
    pub fn is_never(&self) -> bool {
        matches!(self, Self::Never)
    }

    /// Whether arming waits for location authorization on device-backed kinds.
    #[must_use]
    pub fn waits_for_authorization(&self) -> bool {
        matches!(self, Self::Delayed(_) | Self::Idle(_))
    }
}

/// Current state of a [`TimeoutManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Not armed yet
    Idle,
    /// Counting down
    Armed {
        /// When the timer elapses
        deadline: Instant,
        /// Generation of the scheduled timer
        generation: u64,
    },
    /// Elapsed; terminal
    Fired,
    /// Cancelled or disarmed; terminal
    Cancelled,
}

/// A timer the caller must schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerArm {
    /// When to call [`TimeoutManager::fire`]
    pub deadline: Instant,
    /// Value to pass back to [`TimeoutManager::fire`]
    pub generation: u64,
}

/// What an accepted value did to the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerUpdate {
    /// Nothing changed
    Unchanged,
    /// A new timer must replace the scheduled one
    Rearmed(TimerArm),
    /// The scheduled timer must be dropped
    Disarmed,
}

/// Timeout bookkeeping for one request.
#[derive(Debug, Clone)]
pub struct TimeoutManager {
    mode: TimeoutMode,
    state: TimerState,
    generation: u64,
    interval: Duration,
}

impl TimeoutManager {
    /// Create an unarmed manager.
    #[must_use]
    pub fn new(mode: TimeoutMode) -> Self {
        Self {
            mode,
            state: TimerState::Idle,
            generation: 0,
            interval: Duration::ZERO,
        }
    }

    /// Configured mode.
    #[must_use]
    pub fn mode(&self) -> TimeoutMode {
        self.mode
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> TimerState {
        self.state
    }

    /// `true` while a timer is counting down.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        matches!(self.state, TimerState::Armed { .. })
    }

    /// Arm the timer if it is idle and configured.
    ///
    /// `authorized` gates [`TimeoutMode::Delayed`] and [`TimeoutMode::Idle`];
    /// an absolute deadline is armed regardless. Calling again while armed or
    /// after firing returns `None`.
    pub fn arm(&mut self, now: Instant, now_utc: DateTime<Utc>, authorized: bool) -> Option<TimerArm> {
        if self.state != TimerState::Idle {
            return None;
        }

        let interval = match self.mode {
            TimeoutMode::Never => return None,
            TimeoutMode::Delayed(_) | TimeoutMode::Idle(_) if !authorized => return None,
            TimeoutMode::Delayed(interval) | TimeoutMode::Idle(interval) => interval,
            TimeoutMode::Absolute(at) => (at - now_utc).to_std().unwrap_or(Duration::ZERO),
        };

        self.interval = interval;
        Some(self.schedule(now))
    }

    /// Account for an accepted value.
    pub fn on_data(&mut self, now: Instant) -> TimerUpdate {
        if !self.is_armed() {
            return TimerUpdate::Unchanged;
        }

        match self.mode {
            TimeoutMode::Delayed(_) => {
                self.state = TimerState::Cancelled;
                TimerUpdate::Disarmed
            }
            TimeoutMode::Idle(_) => TimerUpdate::Rearmed(self.schedule(now)),
            TimeoutMode::Never | TimeoutMode::Absolute(_) => TimerUpdate::Unchanged,
        }
    }

    /// Cancel the timer. Returns `true` if one was armed.
    pub fn cancel(&mut self) -> bool {
        let was_armed = self.is_armed();
        if self.state != TimerState::Fired {
            self.state = TimerState::Cancelled;
        }
        was_armed
    }

    /// Handle an elapsed timer.
    ///
    /// Returns the interval to report when `generation` is the live one, and
    /// `None` for stale or cancelled timers. Fires at most once.
    pub fn fire(&mut self, generation: u64) -> Option<Duration> {
        match self.state {
            TimerState::Armed {
                generation: live, ..
            } if live == generation => {
                self.state = TimerState::Fired;
                Some(self.interval)
            }
            _ => None,
        }
    }

    fn schedule(&mut self, now: Instant) -> TimerArm {
        self.generation = self.generation.wrapping_add(1);
        let deadline = now + self.interval;
        self.state = TimerState::Armed {
            deadline,
            generation: self.generation,
        };
        TimerArm {
            deadline,
            generation: self.generation,
        }
    }
}
