use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::error::SessionError;

/// How an armed batch ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    Confirmed { latency: Duration },
    Cancelled,
}

#[derive(Debug)]
struct Armed {
    confirmation_id: u64,
    sent_at: Instant,
    tx: oneshot::Sender<Resolution>,
}

/// Single-slot rendezvous between the send path and the receive path.
///
/// At most one batch is armed at a time. Each armed batch resolves exactly
/// once, either by a confirm or by [`ConfirmSlot::cancel`].
#[derive(Debug, Default)]
pub struct ConfirmSlot {
    armed: Mutex<Option<Armed>>,
}

impl ConfirmSlot {
    /// Arms the slot for `confirmation_id`, stamping the send instant.
    ///
    /// # Errors
    ///
    /// Returns `BatchInFlight` when an earlier batch is still unresolved.
    pub fn arm(&self, confirmation_id: u64) -> Result<oneshot::Receiver<Resolution>, SessionError> {
        let mut armed = self.lock();
        if armed.is_some() {
            return Err(SessionError::BatchInFlight { confirmation_id });
        }
        let (tx, rx) = oneshot::channel();
        *armed = Some(Armed {
            confirmation_id,
            sent_at: Instant::now(),
            tx,
        });
        Ok(rx)
    }

    #[must_use]
    pub fn armed_id(&self) -> Option<u64> {
        self.lock().as_ref().map(|armed| armed.confirmation_id)
    }

    /// Resolves the armed batch as confirmed and returns its latency, or
    /// `None` when nothing is in flight.
    pub fn resolve(&self) -> Option<Duration> {
        let armed = self.lock().take()?;
        let latency = armed.sent_at.elapsed();
        drop(armed.tx.send(Resolution::Confirmed { latency }));
        Some(latency)
    }

    /// Releases any waiter without a confirmation. Returns whether a batch
    /// was in flight.
    pub fn cancel(&self) -> bool {
        match self.lock().take() {
            Some(armed) => {
                drop(armed.tx.send(Resolution::Cancelled));
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Armed>> {
        self.armed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
