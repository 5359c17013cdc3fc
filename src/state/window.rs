use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

/// Latency samples kept per window before the oldest are dropped.
pub const DEFAULT_LATENCY_SAMPLES: usize = 5000;

/// Everything recorded since the previous reset.
#[derive(Debug, Clone, Default)]
pub struct WindowSnapshot {
    /// Confirmation latencies in seconds, oldest first.
    pub latencies: Vec<f64>,
    pub batches_sent: u64,
    pub confirms: u64,
    pub errors: u64,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub(super) struct Window {
    batches_sent: u64,
    confirms: u64,
    errors: u64,
    latencies: VecDeque<f64>,
    capacity: usize,
    started: Instant,
}

impl Window {
    pub(super) fn new(capacity: usize) -> Self {
        Self {
            batches_sent: 0,
            confirms: 0,
            errors: 0,
            latencies: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            started: Instant::now(),
        }
    }

    pub(super) const fn record_sent(&mut self) {
        self.batches_sent = self.batches_sent.saturating_add(1);
    }

    pub(super) const fn record_error(&mut self) {
        self.errors = self.errors.saturating_add(1);
    }

    pub(super) fn record_confirm(&mut self, latency: Duration) {
        self.confirms = self.confirms.saturating_add(1);
        if self.capacity == 0 {
            return;
        }
        while self.latencies.len() >= self.capacity {
            self.latencies.pop_front();
        }
        self.latencies.push_back(latency.as_secs_f64());
    }

    pub(super) fn into_snapshot(self) -> WindowSnapshot {
        WindowSnapshot {
            latencies: self.latencies.into(),
            batches_sent: self.batches_sent,
            confirms: self.confirms,
            errors: self.errors,
            elapsed: self.started.elapsed(),
        }
    }

    pub(super) const fn capacity(&self) -> usize {
        self.capacity
    }
}
