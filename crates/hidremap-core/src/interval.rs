// hidremap Interval Checker
// Stopwatch and clock sources shared by every timed rule

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Source of the current time for the dispatch context
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    /// Move time forward by whole milliseconds
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// Answers "has at least N milliseconds elapsed since it was last armed".
///
/// A checker that was never armed reports every threshold as elapsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntervalChecker {
    begin: Option<Instant>,
}

impl IntervalChecker {
    pub fn new() -> Self {
        Self { begin: None }
    }

    /// A checker armed at a known instant
    pub fn started_at(begin: Instant) -> Self {
        Self { begin: Some(begin) }
    }

    /// Arm (or re-arm) the stopwatch
    pub fn begin(&mut self, now: Instant) {
        self.begin = Some(now);
    }

    pub fn reset(&mut self) {
        self.begin = None;
    }

    pub fn is_started(&self) -> bool {
        self.begin.is_some()
    }

    /// Milliseconds since the last `begin` (0 when never armed)
    pub fn elapsed_ms(&self, now: Instant) -> u64 {
        self.begin
            .map(|begin| now.saturating_duration_since(begin).as_millis() as u64)
            .unwrap_or(0)
    }

    /// True once `threshold_ms` has elapsed since the last `begin`
    pub fn check_threshold(&self, now: Instant, threshold_ms: u64) -> bool {
        match self.begin {
            None => true,
            Some(_) => self.elapsed_ms(now) >= threshold_ms,
        }
    }
}
