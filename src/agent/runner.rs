use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, error, trace};

use crate::error::{FailureKind, SessionError};
use crate::shutdown::{ShutdownReceiver, is_shutdown, wait_for_shutdown};
use crate::state::SharedState;
use crate::transport::{
    Connector, DEFAULT_AUTH_READ_ATTEMPTS, Session, SessionReader, SessionWriter,
};
use crate::wire::{DEFAULT_MAX_FRAME_BYTES, Inbound, build_event_batch, build_identity_message, classify};

use super::identity::AgentIdentity;
use super::pacing::pacing_interval;
use super::phase::{AgentPhase, PhaseCell};
use super::slot::{ConfirmSlot, Resolution};

/// Consecutive non-confirm messages tolerated while a batch is in flight.
pub const DEFAULT_CONFIRM_READ_ATTEMPTS: usize = 3;
/// Delay between passing the approval barrier and the first batch.
pub const DEFAULT_START_STAGGER: Duration = Duration::from_secs(1);
/// How often a paused agent re-checks whether a rate change has settled.
pub const DEFAULT_RATE_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub bootstrap_token: String,
    pub auth_read_attempts: usize,
    pub confirm_read_attempts: usize,
    pub start_stagger: Duration,
    pub rate_poll_interval: Duration,
    pub max_frame_bytes: Option<usize>,
}

impl AgentSettings {
    #[must_use]
    pub fn new(bootstrap_token: impl Into<String>) -> Self {
        Self {
            bootstrap_token: bootstrap_token.into(),
            auth_read_attempts: DEFAULT_AUTH_READ_ATTEMPTS,
            confirm_read_attempts: DEFAULT_CONFIRM_READ_ATTEMPTS,
            start_stagger: DEFAULT_START_STAGGER,
            rate_poll_interval: DEFAULT_RATE_POLL_INTERVAL,
            max_frame_bytes: Some(DEFAULT_MAX_FRAME_BYTES),
        }
    }
}

/// Final state of one agent after it stopped.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    pub identity: AgentIdentity,
    pub phase: AgentPhase,
    pub batches_sent: u64,
    pub batches_confirmed: u64,
    pub failure: Option<FailureKind>,
}

/// One simulated client. Owns its connection exclusively and only talks to
/// the rest of the run through [`SharedState`].
pub struct Agent {
    identity: AgentIdentity,
    state: Arc<SharedState>,
    settings: Arc<AgentSettings>,
    shutdown_rx: ShutdownReceiver,
    phase: PhaseCell,
    slot: ConfirmSlot,
    sent: AtomicU64,
    confirmed: AtomicU64,
}

impl Agent {
    #[must_use]
    pub fn new(
        identity: AgentIdentity,
        state: Arc<SharedState>,
        settings: Arc<AgentSettings>,
        shutdown_rx: ShutdownReceiver,
    ) -> Self {
        Self {
            identity,
            state,
            settings,
            shutdown_rx,
            phase: PhaseCell::new(AgentPhase::Connecting),
            slot: ConfirmSlot::default(),
            sent: AtomicU64::new(0),
            confirmed: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub const fn identity(&self) -> &AgentIdentity {
        &self.identity
    }

    /// Runs the agent until stop or its first failure. A failure outside
    /// shutdown is recorded exactly once in the shared window.
    pub async fn run(self, connector: Arc<dyn Connector>) -> AgentOutcome {
        let failure = match self.drive(connector.as_ref()).await {
            Ok(()) => None,
            Err(err) if self.is_stopping() => {
                debug!(
                    "Agent {} ignoring error during shutdown: {}",
                    self.identity.name, err
                );
                None
            }
            Err(err) => {
                self.phase.set(AgentPhase::Error);
                self.state.on_error();
                error!(
                    "Agent {} failed ({}): {}",
                    self.identity.name,
                    err.kind(),
                    err
                );
                Some(err.kind())
            }
        };
        if failure.is_none() {
            self.phase.set(AgentPhase::Closed);
        }

        AgentOutcome {
            phase: self.phase.get(),
            batches_sent: self.sent.load(Ordering::Acquire),
            batches_confirmed: self.confirmed.load(Ordering::Acquire),
            failure,
            identity: self.identity,
        }
    }

    async fn drive(&self, connector: &dyn Connector) -> Result<(), SessionError> {
        let mut shutdown_rx = self.shutdown_rx.clone();

        self.phase.set(AgentPhase::Connecting);
        let stream = tokio::select! {
            result = connector.connect() => result?,
            () = wait_for_shutdown(&mut shutdown_rx) => return Ok(()),
        };
        let mut session = Session::new(stream, self.settings.max_frame_bytes);

        self.phase.set(AgentPhase::Authenticating);
        let identity = build_identity_message(
            &self.identity.name,
            &self.identity.peer_id,
            &self.settings.bootstrap_token,
        );
        tokio::select! {
            result = session.authenticate(&identity, self.settings.auth_read_attempts) => result?,
            () = wait_for_shutdown(&mut shutdown_rx) => return Ok(()),
        }

        self.phase.set(AgentPhase::Ready);
        self.state.on_agent_approved();
        debug!("Agent {} approved", self.identity.name);

        tokio::select! {
            () = self.wait_start() => {}
            () = wait_for_shutdown(&mut shutdown_rx) => return Ok(()),
        }

        let (reader, mut writer) = session.into_split();
        let result = tokio::select! {
            result = self.receive_loop(reader) => result,
            result = self.send_loop(&mut writer) => result,
            () = wait_for_shutdown(&mut shutdown_rx) => Ok(()),
        };

        self.phase.set(AgentPhase::Draining);
        if self.slot.cancel() {
            trace!("Agent {} released an unconfirmed batch", self.identity.name);
        }
        writer.close().await;
        result
    }

    async fn wait_start(&self) {
        self.state.wait_ready().await;
        if !self.settings.start_stagger.is_zero() {
            tokio::time::sleep(self.settings.start_stagger).await;
        }
    }

    async fn send_loop<S>(&self, writer: &mut SessionWriter<S>) -> Result<(), SessionError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let mut confirmation_id: u64 = 1;
        let mut pending: Option<oneshot::Receiver<Resolution>> = None;

        loop {
            if let Some(confirm_rx) = pending.take() {
                self.phase.set(AgentPhase::WaitingForConfirm);
                match confirm_rx.await {
                    Ok(Resolution::Confirmed { .. }) => {}
                    Ok(Resolution::Cancelled) | Err(_) => return Ok(()),
                }
            }

            while self.state.is_changing_rate() {
                if self.is_stopping() {
                    return Ok(());
                }
                tokio::time::sleep(self.settings.rate_poll_interval).await;
            }
            if self.is_stopping() {
                return Ok(());
            }

            self.phase.set(AgentPhase::Sending);
            confirmation_id = confirmation_id.saturating_add(1);
            let events_per_batch = self.state.events_per_batch();
            let batch = build_event_batch(events_per_batch, confirmation_id).map_err(|source| {
                SessionError::Send {
                    context: "event batch",
                    source,
                }
            })?;
            let confirm_rx = self.slot.arm(confirmation_id)?;
            // Only the send itself counts against the pacing interval.
            let send_started = Instant::now();
            writer.send(&batch, "event batch").await?;
            self.sent.fetch_add(1, Ordering::AcqRel);
            self.state.on_batch_sent();
            pending = Some(confirm_rx);
            self.phase.set(AgentPhase::WaitingForConfirm);

            let interval = pacing_interval(events_per_batch, self.state.rate_per_agent());
            if let Some(remaining) = interval.checked_sub(send_started.elapsed())
                && !remaining.is_zero()
            {
                tokio::time::sleep(remaining).await;
            }
        }
    }

    async fn receive_loop<S>(&self, mut reader: SessionReader<S>) -> Result<(), SessionError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let mut unmatched = 0usize;
        loop {
            let message = reader.recv().await?;
            match classify(&message) {
                Inbound::Confirm => {
                    unmatched = 0;
                    match self.slot.resolve() {
                        Some(latency) => {
                            self.confirmed.fetch_add(1, Ordering::AcqRel);
                            self.state.on_confirm(latency);
                            trace!(
                                "Agent {} confirmed in {:?}",
                                self.identity.name, latency
                            );
                        }
                        None => debug!(
                            "Agent {} got a confirm with no batch in flight",
                            self.identity.name
                        ),
                    }
                }
                Inbound::AuthApproved | Inbound::Unrecognized => {
                    let Some(confirmation_id) = self.slot.armed_id() else {
                        continue;
                    };
                    unmatched = unmatched.saturating_add(1);
                    if unmatched >= self.settings.confirm_read_attempts {
                        return Err(SessionError::MissingAck {
                            attempts: unmatched,
                            confirmation_id,
                        });
                    }
                }
            }
        }
    }

    fn is_stopping(&self) -> bool {
        is_shutdown(&self.shutdown_rx)
    }
}
