use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::slo::{BreachMode, BreachPolicy};
use crate::state::DEFAULT_SETTLE_DELAY;

/// Named phase sequences selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioKind {
    /// Warm-up, then ramp until an SLO breach to find capacity.
    #[default]
    MaxLoad,
    /// Warm-up, then repeated spikes above the target with recovery.
    Spike,
    /// Warm-up, then a long hold below the target.
    Soak,
    /// Warm-up, ramp, one spike, settle and soak at the discovered capacity.
    Full,
}

impl ScenarioKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ScenarioKind::MaxLoad => "max-load",
            ScenarioKind::Spike => "spike",
            ScenarioKind::Soak => "soak",
            ScenarioKind::Full => "full",
        }
    }
}

/// How the ramp decides what "best sustainable" means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityMeasure {
    /// Highest confirmed EPS measured in a passing step.
    ConfirmedEps,
    /// Target of the last passing step, seeded with the ramp start.
    StepTarget,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarmupPhase {
    /// Share of the configured target.
    pub fraction: f64,
    pub hold: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampPhase {
    /// Share of the configured target the first step grows from.
    pub start_fraction: f64,
    /// Relative increase per step.
    pub increase: f64,
    pub window: Duration,
    pub max_steps: usize,
    pub policy: BreachPolicy,
    pub capacity: CapacityMeasure,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecoverStep {
    /// Share of capacity held after each spike.
    pub fraction: f64,
    pub hold: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpikePhase {
    pub count: usize,
    /// Multiple of capacity.
    pub multiplier: f64,
    pub hold: Duration,
    pub recover: Option<RecoverStep>,
    /// Evaluated for logging only.
    pub policy: BreachPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettlePhase {
    pub hold: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoakPhase {
    /// Share of capacity.
    pub fraction: f64,
    pub duration: Duration,
    pub log_interval: Duration,
    /// Windows sending below this share of the soak rate are flagged.
    pub low_rate_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    Warmup(WarmupPhase),
    Ramp(RampPhase),
    Spike(SpikePhase),
    Settle(SettlePhase),
    Soak(SoakPhase),
}

impl Phase {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Phase::Warmup(_) => "warmup",
            Phase::Ramp(_) => "ramp",
            Phase::Spike(_) => "spike",
            Phase::Settle(_) => "settle",
            Phase::Soak(_) => "soak",
        }
    }
}

/// Linear phase sequence for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioPlan {
    pub target_eps: f64,
    /// Gate hold after every rate change.
    pub settle_delay: Duration,
    pub phases: Vec<Phase>,
}

/// Tunables the presets are built from.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSettings {
    pub target_eps: f64,
    /// `None` picks the preset default.
    pub warmup: Option<Duration>,
    pub warmup_fraction: f64,
    pub step_window: Duration,
    pub step_increase: f64,
    pub max_steps: usize,
    /// Seconds.
    pub slo_p95: f64,
    pub slo_error_rate: f64,
    /// `None` picks the preset default.
    pub min_throughput_ratio: Option<f64>,
    pub breach_mode: BreachMode,
    pub spikes: usize,
    pub spike_multiplier: f64,
    pub spike_hold: Duration,
    pub spike_recover_fraction: f64,
    pub spike_recover_hold: Duration,
    pub settle_hold: Duration,
    pub soak_fraction: f64,
    pub soak_duration: Duration,
    pub soak_log_interval: Duration,
    pub soak_low_rate_ratio: f64,
    pub settle_delay: Duration,
}

pub const DEFAULT_TARGET_EPS: f64 = 5000.0;
pub const DEFAULT_MAX_LOAD_WARMUP: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_WARMUP: Duration = Duration::from_secs(60);
/// Throughput floor the capacity search applies when none is configured.
pub const DEFAULT_MAX_LOAD_THROUGHPUT_RATIO: f64 = 0.85;
pub const DEFAULT_MAX_STEPS: usize = 1000;

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self {
            target_eps: DEFAULT_TARGET_EPS,
            warmup: None,
            warmup_fraction: 0.5,
            step_window: Duration::from_secs(3 * 60),
            step_increase: 0.10,
            max_steps: DEFAULT_MAX_STEPS,
            slo_p95: 0.5,
            slo_error_rate: 0.01,
            min_throughput_ratio: None,
            breach_mode: BreachMode::Any,
            spikes: 2,
            spike_multiplier: 2.0,
            spike_hold: Duration::from_secs(2 * 60),
            spike_recover_fraction: 0.7,
            spike_recover_hold: Duration::from_secs(30),
            settle_hold: Duration::from_secs(10),
            soak_fraction: 0.75,
            soak_duration: Duration::from_secs(60 * 60),
            soak_log_interval: Duration::from_secs(30),
            soak_low_rate_ratio: 0.85,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

impl ScenarioPlan {
    /// Builds the phase list for a preset.
    #[must_use]
    pub fn preset(kind: ScenarioKind, settings: &ScenarioSettings) -> Self {
        let warmup_hold = settings.warmup.unwrap_or(match kind {
            ScenarioKind::MaxLoad => DEFAULT_MAX_LOAD_WARMUP,
            ScenarioKind::Spike | ScenarioKind::Soak | ScenarioKind::Full => DEFAULT_WARMUP,
        });
        let warmup = Phase::Warmup(WarmupPhase {
            fraction: settings.warmup_fraction,
            hold: warmup_hold,
        });
        let policy = |throughput: Option<f64>| BreachPolicy {
            max_p95: Some(settings.slo_p95),
            max_error_rate: Some(settings.slo_error_rate),
            min_throughput_ratio: settings.min_throughput_ratio.or(throughput),
            mode: settings.breach_mode,
        };
        let soak = Phase::Soak(SoakPhase {
            fraction: settings.soak_fraction,
            duration: settings.soak_duration,
            log_interval: settings.soak_log_interval,
            low_rate_ratio: settings.soak_low_rate_ratio,
        });

        let phases = match kind {
            ScenarioKind::MaxLoad => vec![
                warmup,
                Phase::Ramp(RampPhase {
                    start_fraction: 1.0,
                    increase: settings.step_increase,
                    window: settings.step_window,
                    max_steps: settings.max_steps,
                    policy: policy(Some(DEFAULT_MAX_LOAD_THROUGHPUT_RATIO)),
                    capacity: CapacityMeasure::ConfirmedEps,
                }),
            ],
            ScenarioKind::Spike => vec![
                warmup,
                Phase::Spike(SpikePhase {
                    count: settings.spikes,
                    multiplier: settings.spike_multiplier,
                    hold: settings.spike_hold,
                    recover: Some(RecoverStep {
                        fraction: settings.spike_recover_fraction,
                        hold: settings.spike_recover_hold,
                    }),
                    policy: policy(None),
                }),
            ],
            ScenarioKind::Soak => vec![warmup, soak],
            ScenarioKind::Full => vec![
                warmup,
                Phase::Ramp(RampPhase {
                    start_fraction: settings.warmup_fraction,
                    increase: settings.step_increase,
                    window: settings.step_window,
                    max_steps: settings.max_steps,
                    policy: policy(None),
                    capacity: CapacityMeasure::StepTarget,
                }),
                Phase::Spike(SpikePhase {
                    count: 1,
                    multiplier: settings.spike_multiplier,
                    hold: settings.spike_hold,
                    recover: None,
                    policy: policy(None),
                }),
                Phase::Settle(SettlePhase {
                    hold: settings.settle_hold,
                }),
                soak,
            ],
        };

        Self {
            target_eps: settings.target_eps,
            settle_delay: settings.settle_delay,
            phases,
        }
    }
}
