use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use super::window::{Window, WindowSnapshot};

/// Time the rate gate stays closed after a rate change so in-flight batches
/// sent at the old rate drain before the window is reset.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(5);

/// Rate budget, measurement window and approval barrier for one run.
///
/// Agents only increment counters and read the rate; the scenario
/// controller is the only caller of [`SharedState::set_total_rate`] and
/// [`SharedState::snapshot_and_reset`].
#[derive(Debug)]
pub struct SharedState {
    total_agents: AtomicUsize,
    events_per_batch: AtomicUsize,
    approved: AtomicUsize,
    ready_tx: watch::Sender<bool>,
    rate_total_bits: AtomicU64,
    rate_gate: tokio::sync::Mutex<()>,
    window: Mutex<Window>,
}

impl SharedState {
    #[must_use]
    pub fn new(total_agents: usize, events_per_batch: usize, latency_capacity: usize) -> Self {
        let (ready_tx, _) = watch::channel(false);
        Self {
            total_agents: AtomicUsize::new(total_agents),
            events_per_batch: AtomicUsize::new(events_per_batch),
            approved: AtomicUsize::new(0),
            ready_tx,
            rate_total_bits: AtomicU64::new(0f64.to_bits()),
            rate_gate: tokio::sync::Mutex::new(()),
            window: Mutex::new(Window::new(latency_capacity)),
        }
    }

    #[must_use]
    pub fn total_agents(&self) -> usize {
        self.total_agents.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn events_per_batch(&self) -> usize {
        self.events_per_batch.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn approved_count(&self) -> usize {
        self.approved.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn rate_total(&self) -> f64 {
        f64::from_bits(self.rate_total_bits.load(Ordering::Acquire))
    }

    /// Each agent's share of the total budget.
    #[must_use]
    pub fn rate_per_agent(&self) -> f64 {
        let agents = self.total_agents().max(1);
        self.rate_total() / agents as f64
    }

    /// Stores `eps` as the new total, keeps the gate closed for
    /// `settle_delay`, then discards the window. Concurrent calls run one
    /// after another.
    pub async fn set_total_rate(&self, eps: f64, settle_delay: Duration) {
        let _gate = self.rate_gate.lock().await;
        let eps = sanitize_rate(eps);
        self.store_rate(eps);
        info!(
            "Rate limit set to {:.1} EPS ({:.2} EPS per agent)",
            eps,
            self.rate_per_agent()
        );
        if !settle_delay.is_zero() {
            tokio::time::sleep(settle_delay).await;
        }
        let discarded = self.snapshot_and_reset();
        debug!(
            "Discarded settle window: {} sent, {} confirmed, {} errors",
            discarded.batches_sent, discarded.confirms, discarded.errors
        );
    }

    /// True while a rate change is settling. Never blocks.
    #[must_use]
    pub fn is_changing_rate(&self) -> bool {
        self.rate_gate.try_lock().is_err()
    }

    pub fn on_agent_approved(&self) {
        let approved = self.approved.fetch_add(1, Ordering::AcqRel).saturating_add(1);
        let total = self.total_agents();
        if approved >= total {
            let flipped = self.ready_tx.send_if_modified(|ready| {
                if *ready {
                    false
                } else {
                    *ready = true;
                    true
                }
            });
            if flipped {
                info!("All {} agents approved", total);
            }
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self.ready_tx.borrow()
    }

    /// Resolves once every agent has been approved. Never reverts.
    pub async fn wait_ready(&self) {
        let mut ready_rx = self.ready_tx.subscribe();
        if ready_rx.wait_for(|ready| *ready).await.is_err() {
            debug!("Ready channel closed before all agents were approved");
        }
    }

    pub fn on_batch_sent(&self) {
        self.lock_window().record_sent();
    }

    pub fn on_error(&self) {
        self.lock_window().record_error();
    }

    pub fn on_confirm(&self, latency: Duration) {
        self.lock_window().record_confirm(latency);
    }

    /// Returns everything recorded since the last reset and starts a fresh
    /// window, in one step.
    pub fn snapshot_and_reset(&self) -> WindowSnapshot {
        let mut window = self.lock_window();
        let fresh = Window::new(window.capacity());
        std::mem::replace(&mut *window, fresh).into_snapshot()
    }

    pub fn set_events_per_batch(&self, events_per_batch: usize) {
        self.events_per_batch
            .store(events_per_batch.max(1), Ordering::Release);
        info!("Events per batch set to {}", events_per_batch.max(1));
    }

    /// Raises the agent total; the per-agent share shrinks accordingly.
    pub fn add_agents(&self, count: usize) -> usize {
        let total = self
            .total_agents
            .fetch_add(count, Ordering::AcqRel)
            .saturating_add(count);
        info!("Agent total raised to {}", total);
        total
    }

    fn store_rate(&self, eps: f64) {
        self.rate_total_bits.store(eps.to_bits(), Ordering::Release);
    }

    fn lock_window(&self) -> MutexGuard<'_, Window> {
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn sanitize_rate(eps: f64) -> f64 {
    if eps.is_finite() && eps > 0.0 { eps } else { 0.0 }
}
