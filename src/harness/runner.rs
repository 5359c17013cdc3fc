use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::agent::{Agent, AgentIdentity, AgentOutcome, AgentSettings};
use crate::scenario::{PhaseRecord, ScenarioController, ScenarioPlan, ScenarioSummary};
use crate::shutdown::{
    ShutdownReceiver, ShutdownSender, request_shutdown, shutdown_channel, wait_for_shutdown,
};
use crate::state::{DEFAULT_LATENCY_SAMPLES, SharedState};
use crate::transport::Connector;

use super::command::{ControlCommand, HarnessHandle};
use super::report::RunReport;

pub const DEFAULT_DRAIN_GRACE: Duration = Duration::from_secs(3);
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub agents: usize,
    pub events_per_batch: usize,
    pub latency_samples: usize,
    pub agent: AgentSettings,
    /// `None` starts the scenario without waiting for approvals.
    pub ready_timeout: Option<Duration>,
    pub drain_grace: Duration,
}

impl HarnessConfig {
    #[must_use]
    pub fn new(agents: usize, events_per_batch: usize, agent: AgentSettings) -> Self {
        Self {
            agents,
            events_per_batch,
            latency_samples: DEFAULT_LATENCY_SAMPLES,
            agent,
            ready_timeout: Some(DEFAULT_READY_TIMEOUT),
            drain_grace: DEFAULT_DRAIN_GRACE,
        }
    }
}

type AgentTask = JoinHandle<AgentOutcome>;

/// Owns one run: the shared state, every agent task and the controller.
pub struct Harness {
    config: HarnessConfig,
    settings: Arc<AgentSettings>,
    state: Arc<SharedState>,
    connector: Arc<dyn Connector>,
    controller: Option<ScenarioController>,
    phase_rx: watch::Receiver<Option<PhaseRecord>>,
    settle_delay: Duration,
    shutdown_tx: ShutdownSender,
    shutdown_rx: ShutdownReceiver,
    command_tx: mpsc::UnboundedSender<ControlCommand>,
    command_rx: mpsc::UnboundedReceiver<ControlCommand>,
    agents: Vec<AgentTask>,
    /// `SetTotalRate` commands still holding or waiting for the rate gate.
    rate_tasks: Vec<JoinHandle<()>>,
}

impl Harness {
    #[must_use]
    pub fn new(config: HarnessConfig, plan: ScenarioPlan, connector: Arc<dyn Connector>) -> Self {
        let state = Arc::new(SharedState::new(
            config.agents,
            config.events_per_batch,
            config.latency_samples,
        ));
        let (shutdown_tx, shutdown_rx) = shutdown_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let settle_delay = plan.settle_delay;
        let controller = ScenarioController::new(plan, Arc::clone(&state), shutdown_rx.clone());
        let phase_rx = controller.phase_watch();
        Self {
            settings: Arc::new(config.agent.clone()),
            agents: Vec::with_capacity(config.agents),
            config,
            state,
            connector,
            controller: Some(controller),
            phase_rx,
            settle_delay,
            shutdown_tx,
            shutdown_rx,
            command_tx,
            command_rx,
            rate_tasks: Vec::new(),
        }
    }

    #[must_use]
    pub fn handle(&self) -> HarnessHandle {
        HarnessHandle::new(
            self.command_tx.clone(),
            self.phase_rx.clone(),
            Arc::clone(&self.state),
        )
    }

    #[must_use]
    pub const fn state(&self) -> &Arc<SharedState> {
        &self.state
    }

    /// Runs the scenario to completion or until stopped, then drains the
    /// agents.
    pub async fn run(mut self) -> RunReport {
        info!(
            "Starting {} agents with {} events per batch",
            self.config.agents, self.config.events_per_batch
        );
        self.spawn_agents(self.config.agents);
        self.wait_for_approvals().await;

        let summary = match self.controller.take() {
            Some(controller) => self.drive(controller).await,
            None => ScenarioSummary::new(0.0),
        };

        request_shutdown(&self.shutdown_tx);
        let (outcomes, aborted) = self.drain().await;
        let report = RunReport {
            agents: self.state.total_agents(),
            events_per_batch: self.state.events_per_batch(),
            approved: self.state.approved_count(),
            summary,
            outcomes,
            aborted,
        };
        info!(
            "Run finished: {} batches sent, {} confirmed, {} agent failure(s)",
            report.batches_sent(),
            report.batches_confirmed(),
            report.failures().values().sum::<usize>()
        );
        report
    }

    fn spawn_agents(&mut self, count: usize) {
        for _ in 0..count {
            let agent = Agent::new(
                AgentIdentity::generate(),
                Arc::clone(&self.state),
                Arc::clone(&self.settings),
                self.shutdown_rx.clone(),
            );
            debug!("Spawning agent {}", agent.identity().name);
            self.agents
                .push(tokio::spawn(agent.run(Arc::clone(&self.connector))));
        }
    }

    async fn wait_for_approvals(&mut self) {
        let Some(timeout) = self.config.ready_timeout else {
            return;
        };
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);
        let mut shutdown_rx = self.shutdown_rx.clone();
        let state = Arc::clone(&self.state);
        loop {
            tokio::select! {
                () = state.wait_ready() => return,
                () = &mut deadline => {
                    warn!(
                        "Only {} of {} agents approved after {:?}; starting anyway",
                        state.approved_count(),
                        state.total_agents(),
                        timeout
                    );
                    return;
                }
                () = wait_for_shutdown(&mut shutdown_rx) => return,
                Some(command) = self.command_rx.recv() => self.apply(command),
            }
        }
    }

    async fn drive(&mut self, controller: ScenarioController) -> ScenarioSummary {
        let mut scenario = tokio::spawn(controller.run());
        loop {
            tokio::select! {
                joined = &mut scenario => {
                    return match joined {
                        Ok(summary) => summary,
                        Err(err) => {
                            error!("Scenario task failed: {}", err);
                            let mut summary = ScenarioSummary::new(0.0);
                            summary.interrupted = true;
                            summary
                        }
                    };
                }
                Some(command) = self.command_rx.recv() => self.apply(command),
            }
        }
    }

    fn apply(&mut self, command: ControlCommand) {
        match command {
            ControlCommand::SetTotalRate(eps) => {
                let state = Arc::clone(&self.state);
                let settle_delay = self.settle_delay;
                self.rate_tasks.retain(|task| !task.is_finished());
                self.rate_tasks.push(tokio::spawn(async move {
                    state.set_total_rate(eps, settle_delay).await;
                }));
            }
            ControlCommand::SetEventsPerBatch(events) => self.state.set_events_per_batch(events),
            ControlCommand::AddAgents(count) => {
                self.state.add_agents(count);
                self.spawn_agents(count);
            }
            ControlCommand::Stop => {
                info!("Stop requested");
                request_shutdown(&self.shutdown_tx);
            }
        }
    }

    async fn drain(&mut self) -> (Vec<AgentOutcome>, usize) {
        for task in self.rate_tasks.drain(..) {
            task.abort();
            if let Err(err) = task.await
                && !err.is_cancelled()
            {
                warn!("Rate change task ended abnormally: {}", err);
            }
        }
        let deadline = Instant::now()
            .checked_add(self.config.drain_grace)
            .unwrap_or_else(Instant::now);
        let mut pending: FuturesUnordered<AgentTask> = self.agents.drain(..).collect();
        let mut outcomes = Vec::with_capacity(pending.len());
        loop {
            match tokio::time::timeout_at(deadline, pending.next()).await {
                Ok(Some(Ok(outcome))) => outcomes.push(outcome),
                Ok(Some(Err(err))) => warn!("Agent task ended abnormally: {}", err),
                Ok(None) => return (outcomes, 0),
                Err(_elapsed) => {
                    let aborted = pending.len();
                    warn!("Aborting {} agent(s) still running after drain grace", aborted);
                    for task in pending.iter() {
                        task.abort();
                    }
                    return (outcomes, aborted);
                }
            }
        }
    }
}
