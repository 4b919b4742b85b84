//! Trailing-edge debounce on top of the timer queue.

use crate::timers::{TaskHandle, TimerQueue};

/// Runs only the last call of a burst, `wait_ms` after that call.
#[derive(Debug, Clone)]
pub struct Debouncer {
    wait_ms: u64,
    pending: Option<TaskHandle>,
}

impl Debouncer {
    pub fn new(wait_ms: u64) -> Self {
        Self {
            wait_ms,
            pending: None,
        }
    }

    /// Restart the wait with `f` as the action to run when it elapses.
    pub fn call<T, F>(&mut self, timers: &mut TimerQueue<T>, f: F) -> TaskHandle
    where
        F: FnMut(&mut T) + 'static,
    {
        if let Some(h) = self.pending.take() {
            timers.cancel(h);
        }
        let h = timers.set_timeout(self.wait_ms, None, f);
        self.pending = Some(h);
        h
    }

    pub fn is_pending<T>(&self, timers: &TimerQueue<T>) -> bool {
        self.pending.map(|h| timers.is_pending(h)).unwrap_or(false)
    }

    pub fn cancel<T>(&mut self, timers: &mut TimerQueue<T>) {
        if let Some(h) = self.pending.take() {
            timers.cancel(h);
        }
    }
}
