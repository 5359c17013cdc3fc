use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::scenario::PhaseRecord;
use crate::state::SharedState;

/// Runtime reconfiguration accepted by a running harness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlCommand {
    /// Overrides the total rate until the scenario's next rate change.
    SetTotalRate(f64),
    SetEventsPerBatch(usize),
    /// Spawns more agents; the per-agent share shrinks.
    AddAgents(usize),
    Stop,
}

/// Cloneable front end of a [`Harness`](super::Harness). The harness is the
/// only consumer of the commands sent through it.
#[derive(Debug, Clone)]
pub struct HarnessHandle {
    command_tx: mpsc::UnboundedSender<ControlCommand>,
    phase_rx: watch::Receiver<Option<PhaseRecord>>,
    state: Arc<SharedState>,
}

impl HarnessHandle {
    pub(super) const fn new(
        command_tx: mpsc::UnboundedSender<ControlCommand>,
        phase_rx: watch::Receiver<Option<PhaseRecord>>,
        state: Arc<SharedState>,
    ) -> Self {
        Self {
            command_tx,
            phase_rx,
            state,
        }
    }

    /// Returns `false` once the harness has finished.
    pub fn send(&self, command: ControlCommand) -> bool {
        let delivered = self.command_tx.send(command).is_ok();
        if !delivered {
            debug!("Harness gone, dropping {:?}", command);
        }
        delivered
    }

    pub fn stop(&self) -> bool {
        self.send(ControlCommand::Stop)
    }

    #[must_use]
    pub fn current_phase(&self) -> Option<PhaseRecord> {
        *self.phase_rx.borrow()
    }

    #[must_use]
    pub fn rate_total(&self) -> f64 {
        self.state.rate_total()
    }

    #[must_use]
    pub fn approved_count(&self) -> usize {
        self.state.approved_count()
    }
}
