use clap::{Args, Parser, Subcommand};
use std::time::Duration;

use crate::scenario::{BreachMode, ScenarioKind};

use super::parsers::{
    parse_bool_env, parse_duration_arg, parse_duration_value, parse_fraction, parse_positive_f64,
    parse_positive_u64, parse_positive_usize, parse_ratio,
};
use super::types::{PositiveU64, PositiveUsize};

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Connect one agent, send a few batches and report whether each was confirmed
    Probe(ProbeArgs),
}

#[derive(Debug, Args, Clone)]
pub struct ProbeArgs {
    /// Number of batches to send
    #[arg(long = "batches", default_value = "2", value_parser = parse_positive_u64)]
    pub batches: PositiveU64,

    /// Events per probe batch
    #[arg(long = "batch-size", default_value = "10", value_parser = parse_positive_usize)]
    pub batch_size: PositiveUsize,

    /// Pause between probe batches (supports ms/s/m/h)
    #[arg(long = "interval", default_value = "5s", value_parser = parse_duration_value)]
    pub interval: Duration,
}

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Capacity and load tester for length-prefixed agent protocols: simulates hundreds of agents, ramps their aggregate event rate through warm-up, ramp, spike and soak phases, and stops at the first SLO breach."
)]
pub struct HarnessArgs {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Server host name or address
    #[arg(long, default_value = "127.0.0.1", help_heading = "Connection")]
    pub host: String,

    /// Server port
    #[arg(long, default_value_t = 8444, help_heading = "Connection")]
    pub port: u16,

    /// Bootstrap token sent in every identity message
    #[arg(
        long,
        env = "AGENTSTORM_TOKEN",
        hide_env_values = true,
        help_heading = "Connection"
    )]
    pub token: Option<String>,

    /// Connect over plain TCP instead of TLS
    #[arg(long = "no-tls", help_heading = "Connection")]
    pub no_tls: bool,

    /// Number of simulated agents
    #[arg(long, default_value = "200", value_parser = parse_positive_usize, help_heading = "Load")]
    pub agents: PositiveUsize,

    /// Events per batch
    #[arg(long = "event-batch", default_value = "100", value_parser = parse_positive_usize, help_heading = "Load")]
    pub event_batch: PositiveUsize,

    /// Target aggregate events per second
    #[arg(long = "target-eps", default_value = "5000", value_parser = parse_positive_f64, help_heading = "Load")]
    pub target_eps: f64,

    /// Phase preset to run
    #[arg(long, value_enum, default_value_t = ScenarioKind::MaxLoad, help_heading = "Load")]
    pub scenario: ScenarioKind,

    /// Warm-up hold; 0 skips it (defaults to 5m for max-load, 1m otherwise)
    #[arg(long, value_parser = parse_duration_value, help_heading = "Warm-up")]
    pub warmup: Option<Duration>,

    /// Share of the target used during warm-up
    #[arg(long = "warmup-fraction", default_value = "0.5", value_parser = parse_fraction, help_heading = "Warm-up")]
    pub warmup_fraction: f64,

    /// Hold per ramp step (supports ms/s/m/h)
    #[arg(long = "step-window", default_value = "3m", value_parser = parse_duration_arg, help_heading = "Ramp")]
    pub step_window: Duration,

    /// Relative rate increase per ramp step
    #[arg(long = "step-increase", default_value = "0.10", value_parser = parse_positive_f64, help_heading = "Ramp")]
    pub step_increase: f64,

    /// Upper bound on ramp steps
    #[arg(long = "max-steps", default_value = "1000", value_parser = parse_positive_usize, help_heading = "Ramp")]
    pub max_steps: PositiveUsize,

    /// p95 latency threshold (supports ms/s/m/h)
    #[arg(long = "slo-p95", default_value = "500ms", value_parser = parse_duration_arg, help_heading = "SLO")]
    pub slo_p95: Duration,

    /// Error rate threshold
    #[arg(long = "slo-error-rate", default_value = "0.01", value_parser = parse_ratio, help_heading = "SLO")]
    pub slo_error_rate: f64,

    /// Minimum confirmed/target ratio per ramp step (max-load defaults to 0.85)
    #[arg(long = "min-throughput-ratio", value_parser = parse_ratio, help_heading = "SLO")]
    pub min_throughput_ratio: Option<f64>,

    /// How breach predicates combine
    #[arg(long = "breach-mode", value_enum, default_value_t = BreachMode::Any, help_heading = "SLO")]
    pub breach_mode: BreachMode,

    /// Number of spikes
    #[arg(long, default_value = "2", value_parser = parse_positive_usize, help_heading = "Spike")]
    pub spikes: PositiveUsize,

    /// Spike rate as a multiple of capacity
    #[arg(long = "spike-multiplier", default_value = "2.0", value_parser = parse_positive_f64, help_heading = "Spike")]
    pub spike_multiplier: f64,

    /// Hold per spike
    #[arg(long = "spike-hold", default_value = "2m", value_parser = parse_duration_value, help_heading = "Spike")]
    pub spike_hold: Duration,

    /// Share of capacity held after each spike
    #[arg(long = "spike-recover-fraction", default_value = "0.7", value_parser = parse_fraction, help_heading = "Spike")]
    pub spike_recover_fraction: f64,

    /// Hold of each recovery
    #[arg(long = "spike-recover-hold", default_value = "30s", value_parser = parse_duration_value, help_heading = "Spike")]
    pub spike_recover_hold: Duration,

    /// Hold at capacity between spike and soak
    #[arg(long = "settle-hold", default_value = "10s", value_parser = parse_duration_value, help_heading = "Soak")]
    pub settle_hold: Duration,

    /// Share of capacity held during soak
    #[arg(long = "soak-fraction", default_value = "0.75", value_parser = parse_fraction, help_heading = "Soak")]
    pub soak_fraction: f64,

    /// Soak length
    #[arg(long = "soak-duration", default_value = "60m", value_parser = parse_duration_value, help_heading = "Soak")]
    pub soak_duration: Duration,

    /// Interval between soak log lines
    #[arg(long = "soak-log-interval", default_value = "30s", value_parser = parse_duration_arg, help_heading = "Soak")]
    pub soak_log_interval: Duration,

    /// Send rate share below which a soak window is flagged
    #[arg(long = "soak-low-rate-ratio", default_value = "0.85", value_parser = parse_ratio, help_heading = "Soak")]
    pub soak_low_rate_ratio: f64,

    /// Pause after every rate change before measuring
    #[arg(long = "settle-delay", default_value = "5s", value_parser = parse_duration_value, help_heading = "Timing")]
    pub settle_delay: Duration,

    /// Delay between the approval barrier and each agent's first batch
    #[arg(long = "start-stagger", default_value = "1s", value_parser = parse_duration_value, help_heading = "Timing")]
    pub start_stagger: Duration,

    /// Time agents get to finish after stop before they are aborted
    #[arg(long = "drain-grace", default_value = "3s", value_parser = parse_duration_value, help_heading = "Timing")]
    pub drain_grace: Duration,

    /// Maximum wait for every agent to be approved; 0 disables the wait
    #[arg(long = "ready-timeout", default_value = "60s", value_parser = parse_duration_value, help_heading = "Timing")]
    pub ready_timeout: Duration,

    /// Messages read while waiting for auth approval
    #[arg(long = "auth-attempts", default_value = "3", value_parser = parse_positive_usize, help_heading = "Limits")]
    pub auth_attempts: PositiveUsize,

    /// Non-confirm messages tolerated while a batch is in flight
    #[arg(long = "confirm-attempts", default_value = "3", value_parser = parse_positive_usize, help_heading = "Limits")]
    pub confirm_attempts: PositiveUsize,

    /// Largest inbound frame accepted, in bytes
    #[arg(long = "max-frame-bytes", default_value = "16777216", value_parser = parse_positive_usize, help_heading = "Limits")]
    pub max_frame_bytes: PositiveUsize,

    /// Latency samples kept per measurement window
    #[arg(long = "latency-samples", default_value = "5000", value_parser = parse_positive_usize, help_heading = "Limits")]
    pub latency_samples: PositiveUsize,

    /// Append the ramp results to this CSV file
    #[arg(long = "save-to", help_heading = "Common Options")]
    pub save_to: Option<String>,

    /// Path to config file (TOML/JSON). Defaults to ./agentstorm.toml or ./agentstorm.json if present.
    #[arg(long, help_heading = "Common Options")]
    pub config: Option<String>,

    /// Enable verbose logging (sets log level to debug unless overridden by AGENTSTORM_LOG/RUST_LOG)
    #[arg(long, short = 'v', help_heading = "Common Options")]
    pub verbose: bool,

    /// Disable color output
    #[arg(long = "no-color", env = "NO_COLOR", value_parser = parse_bool_env, help_heading = "Common Options")]
    pub no_color: bool,
}
