use std::time::Duration;

use serde::Deserialize;

use crate::args::parsers::parse_duration_value;
use crate::error::ValidationError;
use crate::scenario::{BreachMode, ScenarioKind};

/// File-level mirror of the command line. Every field is optional; values
/// given on the command line win.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub token: Option<String>,
    pub no_tls: Option<bool>,
    pub agents: Option<usize>,
    #[serde(alias = "events_per_batch")]
    pub event_batch: Option<usize>,
    pub target_eps: Option<f64>,
    pub scenario: Option<ScenarioKind>,
    pub warmup: Option<DurationValue>,
    pub warmup_fraction: Option<f64>,
    pub step_window: Option<DurationValue>,
    pub step_increase: Option<f64>,
    pub max_steps: Option<usize>,
    pub slo_p95: Option<DurationValue>,
    pub slo_error_rate: Option<f64>,
    pub min_throughput_ratio: Option<f64>,
    pub breach_mode: Option<BreachMode>,
    pub spikes: Option<usize>,
    pub spike_multiplier: Option<f64>,
    pub spike_hold: Option<DurationValue>,
    pub spike_recover_fraction: Option<f64>,
    pub spike_recover_hold: Option<DurationValue>,
    pub settle_hold: Option<DurationValue>,
    pub soak_fraction: Option<f64>,
    pub soak_duration: Option<DurationValue>,
    pub soak_log_interval: Option<DurationValue>,
    pub soak_low_rate_ratio: Option<f64>,
    pub settle_delay: Option<DurationValue>,
    pub start_stagger: Option<DurationValue>,
    pub drain_grace: Option<DurationValue>,
    pub ready_timeout: Option<DurationValue>,
    pub auth_attempts: Option<usize>,
    pub confirm_attempts: Option<usize>,
    pub max_frame_bytes: Option<usize>,
    pub latency_samples: Option<usize>,
    pub save_to: Option<String>,
}

/// Bare numbers are seconds; strings take the CLI's unit suffixes.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    /// # Errors
    ///
    /// Returns an error when the text form does not parse.
    pub fn to_duration(&self) -> Result<Duration, ValidationError> {
        match self {
            DurationValue::Seconds(secs) => Ok(Duration::from_secs(*secs)),
            DurationValue::Text(text) => parse_duration_value(text),
        }
    }
}
