// hidremap Timers
// One-shot timers scheduled against the single dispatch context

use std::time::{Duration, Instant};

/// A one-shot timer owned by the dispatch context.
///
/// Timers never call back on their own: the event loop asks for the next
/// deadline, sleeps until it, and then lets the engine take every due timer.
/// A canceled timer has no deadline, so it can never fire afterwards.
#[derive(Debug, Clone)]
pub struct Timer {
    name: &'static str,
    bound: bool,
    deadline: Option<Instant>,
}

impl Timer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            bound: false,
            deadline: None,
        }
    }

    /// Bind to the dispatch context; an unbound timer refuses to arm
    pub fn bind(&mut self) {
        self.bound = true;
    }

    /// Cancel and detach from the dispatch context
    pub fn unbind(&mut self) {
        self.deadline = None;
        self.bound = false;
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Arm (or re-arm) the timer `ms` milliseconds from `now`.
    ///
    /// A zero delay makes the timer due immediately.
    pub fn set_timeout_ms(&mut self, now: Instant, ms: u64) {
        if !self.bound {
            log::warn!("timer '{}' armed before initialize, ignoring", self.name);
            return;
        }
        self.deadline = Some(now + Duration::from_millis(ms));
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Disarm and report true if the deadline has passed
    pub fn take_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Earliest of two optional deadlines
pub fn earliest(a: Option<Instant>, b: Option<Instant>) -> Option<Instant> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}
