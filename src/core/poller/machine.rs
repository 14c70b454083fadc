//! Scheduling state machine for one poll subscription.
//!
//! Pure bookkeeping: every input returns a [`Directive`] telling the driver
//! what to do with its single timer. No clocks, no I/O.

use std::time::Duration;

use serde::Serialize;

/// Observable phase of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollPhase {
    /// Fetching on the base interval.
    Active,
    /// At least one consecutive failure; next fetch is delayed.
    BackingOff,
    /// Failure budget exhausted. Only `resume` restarts automatic fetches.
    Paused,
    /// Host is hidden; the timer is dropped until it becomes visible.
    Suspended,
}

impl PollPhase {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::BackingOff => "backing off",
            Self::Paused => "paused",
            Self::Suspended => "suspended",
        }
    }
}

/// What the driver must do after feeding an input to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Start an automatic fetch now.
    FetchNow,
    /// Replace the timer with one firing after the given delay.
    Arm(Duration),
    /// Drop the pending timer.
    Disarm,
    /// Leave everything as it is.
    Idle,
}

/// Per-subscription scheduling state.
#[derive(Debug, Clone)]
pub struct PollMachine {
    interval: Duration,
    max_retries: u32,
    failures: u32,
    paused: bool,
    visible: bool,
    timer_armed: bool,
    automatic_in_flight: bool,
}

impl PollMachine {
    /// `max_retries` is the number of retries allowed after the first
    /// failure; the subscription pauses on the failure after that.
    #[must_use]
    pub const fn new(interval: Duration, max_retries: u32) -> Self {
        Self {
            interval,
            max_retries,
            failures: 0,
            paused: false,
            visible: true,
            timer_armed: false,
            automatic_in_flight: false,
        }
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub const fn consecutive_failures(&self) -> u32 {
        self.failures
    }

    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    #[must_use]
    pub const fn polling_enabled(&self) -> bool {
        !self.interval.is_zero()
    }

    #[must_use]
    pub const fn phase(&self) -> PollPhase {
        if self.paused {
            PollPhase::Paused
        } else if !self.visible {
            PollPhase::Suspended
        } else if self.failures > 0 {
            PollPhase::BackingOff
        } else {
            PollPhase::Active
        }
    }

    /// Delay before the next automatic fetch: `interval × 2^failures`.
    #[must_use]
    pub fn current_delay(&self) -> Duration {
        let factor = 2_u32.checked_pow(self.failures).unwrap_or(u32::MAX);
        self.interval.saturating_mul(factor)
    }

    /// Subscription mounted: fetch immediately.
    pub fn start(&mut self) -> Directive {
        self.begin_automatic()
    }

    /// The timer fired.
    pub fn on_timer(&mut self) -> Directive {
        self.timer_armed = false;
        if self.paused || !self.visible || self.automatic_in_flight {
            return Directive::Idle;
        }
        self.begin_automatic()
    }

    /// An automatic fetch finished.
    pub fn on_automatic_complete(&mut self, success: bool) -> Directive {
        self.automatic_in_flight = false;
        self.record_outcome(success);

        if !self.polling_enabled() || self.paused || !self.visible {
            return self.disarm();
        }
        self.arm(self.current_delay())
    }

    /// A manual refetch finished. Never schedules a fetch of its own.
    pub fn on_manual_complete(&mut self, success: bool) -> Directive {
        let was_paused = self.paused;
        self.record_outcome(success);

        if self.paused && !was_paused {
            return self.disarm();
        }
        if success && self.timer_armed {
            return self.arm(self.interval);
        }
        Directive::Idle
    }

    /// Leave the paused state: reset the failure budget and fetch.
    pub fn resume(&mut self) -> Directive {
        if !self.paused {
            return Directive::Idle;
        }
        self.paused = false;
        self.failures = 0;
        if !self.visible || self.automatic_in_flight {
            return Directive::Idle;
        }
        self.begin_automatic()
    }

    /// Host visibility changed.
    pub fn set_visible(&mut self, visible: bool) -> Directive {
        if visible == self.visible {
            return Directive::Idle;
        }
        self.visible = visible;

        if !visible {
            return self.disarm();
        }
        if self.paused || !self.polling_enabled() || self.automatic_in_flight {
            return Directive::Idle;
        }
        self.begin_automatic()
    }

    fn record_outcome(&mut self, success: bool) {
        if success {
            self.failures = 0;
            return;
        }
        self.failures = self.failures.saturating_add(1);
        if self.polling_enabled() && self.failures > self.max_retries {
            self.paused = true;
        }
    }

    fn begin_automatic(&mut self) -> Directive {
        self.timer_armed = false;
        self.automatic_in_flight = true;
        Directive::FetchNow
    }

    fn arm(&mut self, delay: Duration) -> Directive {
        self.timer_armed = true;
        Directive::Arm(delay)
    }

    fn disarm(&mut self) -> Directive {
        if self.timer_armed {
            self.timer_armed = false;
            Directive::Disarm
        } else {
            Directive::Idle
        }
    }
}
