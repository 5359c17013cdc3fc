//! Load phases and the SLO math that gates them.
mod controller;
mod plan;
mod slo;
mod summary;


pub use controller::{PhaseRecord, ScenarioController, format_hms};
pub use plan::{
    CapacityMeasure, DEFAULT_MAX_LOAD_THROUGHPUT_RATIO, DEFAULT_MAX_LOAD_WARMUP, DEFAULT_MAX_STEPS,
    DEFAULT_TARGET_EPS, DEFAULT_WARMUP, Phase, RampPhase, RecoverStep, ScenarioKind, ScenarioPlan,
    ScenarioSettings, SettlePhase, SoakPhase, SpikePhase, WarmupPhase,
};
pub use slo::{BreachMode, BreachPolicy, BreachVerdict, MIN_PERCENTILE_SAMPLES, WindowStats, p95};
pub use summary::{PhaseReport, ScenarioSummary, StepReport};
