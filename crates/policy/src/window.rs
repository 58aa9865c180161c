use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

/// Length of the rate-limit window.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Timestamps of one agent's accepted tool calls, oldest first.
///
/// Pruned lazily on each check; entries must be recorded in
/// non-decreasing time order.
#[derive(Debug, Clone, Default)]
pub struct InvocationWindow {
    calls: VecDeque<Instant>,
}

impl InvocationWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry at least [`WINDOW`] old, then record `now` if fewer
    /// than `limit` entries remain.
    ///
    /// Returns `Err(retry_after)` when the window is full; a refused
    /// attempt is not recorded.
    pub fn try_record(&mut self, limit: u32, now: Instant) -> Result<(), Duration> {
        self.prune(now);
        if self.calls.len() >= limit as usize {
            let retry_after = self
                .calls
                .front()
                .map(|oldest| WINDOW.saturating_sub(now.saturating_duration_since(*oldest)))
                .unwrap_or(WINDOW);
            return Err(retry_after);
        }
        self.calls.push_back(now);
        Ok(())
    }

    /// Entries still inside the window as of `now`.
    pub fn count(&mut self, now: Instant) -> usize {
        self.prune(now);
        self.calls.len()
    }

    fn prune(&mut self, now: Instant) {
        while let Some(oldest) = self.calls.front() {
            if now.saturating_duration_since(*oldest) < WINDOW {
                break;
            }
            self.calls.pop_front();
        }
    }
}
