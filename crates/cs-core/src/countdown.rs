//! Per-round countdown for timed play.
//!
//! The countdown is driven externally: the caller ticks it once per elapsed
//! second. It reports expiry exactly once, and a cancelled countdown never
//! expires.

/// Result of advancing a countdown by one second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownTick {
    /// Still running with the given seconds left.
    Running(u32),
    /// The deadline passed on this tick.
    Expired,
    /// The countdown was already expired or cancelled.
    Inactive,
}

/// A single-shot countdown measured in whole seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    remaining: u32,
    active: bool,
}

impl Countdown {
    /// Arm a countdown.
    pub fn new(seconds: u32) -> Self {
        Self {
            remaining: seconds,
            active: true,
        }
    }

    /// Seconds left.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Whether the countdown can still expire.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Stop the countdown without expiring.
    pub fn cancel(&mut self) {
        self.active = false;
    }

    /// Advance by one second.
    pub fn tick(&mut self) -> CountdownTick {
        if !self.active {
            return CountdownTick::Inactive;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.active = false;
            CountdownTick::Expired
        } else {
            CountdownTick::Running(self.remaining)
        }
    }
}
