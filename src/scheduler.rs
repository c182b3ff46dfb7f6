//! Cooperative idle-timer abstraction backing the repeat timeout machinery
//! in [`crate::session`].
//!
//! The core decode path never reads a wall clock itself (callers pass
//! `now_us` explicitly, see [`crate::session::default_decode`]); this
//! module exists for callers who'd rather have something drive that clock
//! for them, either by polling or, with the `async` feature, by awaiting
//! a tokio timer.

use log::trace;

/// A monotonically increasing microsecond clock plus a list of
/// "check back at this time" deadlines. Single-threaded; callers that
/// need cross-thread access should wrap one in their own `Mutex`.
#[derive(Debug, Default)]
pub struct Scheduler {
    now_us: u64,
    deadlines: Vec<u64>,
}

impl Scheduler {
    /// A scheduler whose clock starts at zero.
    pub fn new() -> Self {
        Self { now_us: 0, deadlines: Vec::new() }
    }

    /// Current clock value.
    pub fn now(&self) -> u64 {
        self.now_us
    }

    /// Advance the clock and return the deadlines that are now due,
    /// removing them from the pending list.
    pub fn advance(&mut self, delta_us: u64) -> Vec<u64> {
        self.now_us += delta_us;
        let now = self.now_us;
        let (due, pending): (Vec<u64>, Vec<u64>) = self.deadlines.drain(..).partition(|&d| d <= now);
        self.deadlines = pending;
        if !due.is_empty() {
            trace!("scheduler: {} deadline(s) due at {now}us", due.len());
        }
        due
    }

    /// Register a deadline at `now() + delay_us`.
    pub fn schedule(&mut self, delay_us: u64) -> u64 {
        let at = self.now_us + delay_us;
        self.deadlines.push(at);
        at
    }

    /// Number of deadlines still pending.
    pub fn pending_count(&self) -> usize {
        self.deadlines.len()
    }
}

/// Async-driven variant of the idle timer, available behind the `async`
/// feature for callers embedded in a tokio runtime.
#[cfg(feature = "async")]
pub mod r#async {
    use std::time::Duration;

    /// Sleep for `delay_us` microseconds using the tokio timer.
    pub async fn sleep_us(delay_us: u64) {
        tokio::time::sleep(Duration::from_micros(delay_us)).await;
    }
}
