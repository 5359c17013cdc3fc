use std::path::PathBuf;
use std::time::Duration;

use crate::harness::HarnessConfig;
use crate::scenario::{ScenarioKind, ScenarioPlan};
use crate::transport::Endpoint;

/// What the binary was asked to do, fully resolved from CLI and config.
#[derive(Debug)]
pub(crate) enum RunPlan {
    Scenario(RunSettings),
    Probe(ProbeSettings),
}

#[derive(Debug, Clone)]
pub(crate) struct RunSettings {
    pub(crate) endpoint: Endpoint,
    pub(crate) use_tls: bool,
    pub(crate) scenario: ScenarioKind,
    pub(crate) plan: ScenarioPlan,
    pub(crate) harness: HarnessConfig,
    pub(crate) save_to: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub(crate) struct ProbeSettings {
    pub(crate) endpoint: Endpoint,
    pub(crate) use_tls: bool,
    pub(crate) token: String,
    pub(crate) batches: u64,
    pub(crate) batch_size: usize,
    pub(crate) interval: Duration,
    pub(crate) auth_attempts: usize,
    pub(crate) confirm_attempts: usize,
    pub(crate) max_frame_bytes: usize,
}
