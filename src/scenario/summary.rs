use super::slo::WindowStats;

/// Final numbers of one ramp step, persisted by the results export.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub step: usize,
    pub target_eps: f64,
    pub sent: u64,
    pub confirmed: u64,
    pub p95: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhaseReport {
    pub phase: &'static str,
    /// Ramp step or spike cycle number.
    pub step: Option<usize>,
    pub target_eps: f64,
    pub stats: WindowStats,
    /// `None` for windows that are not evaluated against the SLOs.
    pub breached: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSummary {
    pub target_eps: f64,
    /// Rate later phases were scaled from.
    pub capacity_eps: f64,
    pub best_sustainable_eps: Option<f64>,
    pub best_confirmed_eps: f64,
    pub last_step: Option<StepReport>,
    pub breached_at: Option<usize>,
    pub low_rate_windows: usize,
    pub interrupted: bool,
    pub phases: Vec<PhaseReport>,
}

impl ScenarioSummary {
    #[must_use]
    pub const fn new(target_eps: f64) -> Self {
        Self {
            target_eps,
            capacity_eps: target_eps,
            best_sustainable_eps: None,
            best_confirmed_eps: 0.0,
            last_step: None,
            breached_at: None,
            low_rate_windows: 0,
            interrupted: false,
            phases: Vec::new(),
        }
    }
}
