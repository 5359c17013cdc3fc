use clap::ArgMatches;
use clap::parser::ValueSource;

use crate::args::parsers::{
    ensure_fraction, ensure_nonzero_duration, ensure_positive_f64, ensure_ratio,
};
use crate::args::{HarnessArgs, PositiveUsize};
use crate::error::{AppError, AppResult, ConfigError, ValidationError};

use super::types::{ConfigFile, DurationValue};

/// Applies configuration values to CLI arguments. Values that came from the
/// command line (or, for the token, the environment) are kept.
///
/// # Errors
///
/// Returns an error when a config value that would be applied is invalid.
pub fn apply_config(
    args: &mut HarnessArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> AppResult<()> {
    let layer = Layer { matches };

    layer.set("host", &mut args.host, config.host.as_ref(), |host| {
        if host.trim().is_empty() {
            return Err(invalid("host", ValidationError::EmptyHost));
        }
        Ok(host.clone())
    })?;
    layer.set("port", &mut args.port, config.port, Ok)?;
    if !layer.is_explicit("token")
        && let Some(token) = config.token.as_ref()
    {
        args.token = Some(token.clone());
    }
    layer.set("no_tls", &mut args.no_tls, config.no_tls, Ok)?;
    layer.set("agents", &mut args.agents, config.agents, |value| {
        positive_usize(value, "agents")
    })?;
    layer.set(
        "event_batch",
        &mut args.event_batch,
        config.event_batch,
        |value| positive_usize(value, "event_batch"),
    )?;
    layer.set("target_eps", &mut args.target_eps, config.target_eps, |value| {
        field("target_eps", ensure_positive_f64(value))
    })?;
    layer.set("scenario", &mut args.scenario, config.scenario, Ok)?;

    if !is_cli(matches, "warmup")
        && let Some(warmup) = config.warmup.as_ref()
    {
        args.warmup = Some(hold(warmup, "warmup")?);
    }
    layer.set(
        "warmup_fraction",
        &mut args.warmup_fraction,
        config.warmup_fraction,
        |value| field("warmup_fraction", ensure_fraction(value)),
    )?;

    layer.set(
        "step_window",
        &mut args.step_window,
        config.step_window.as_ref(),
        |value| interval(value, "step_window"),
    )?;
    layer.set(
        "step_increase",
        &mut args.step_increase,
        config.step_increase,
        |value| field("step_increase", ensure_positive_f64(value)),
    )?;
    layer.set("max_steps", &mut args.max_steps, config.max_steps, |value| {
        positive_usize(value, "max_steps")
    })?;

    layer.set("slo_p95", &mut args.slo_p95, config.slo_p95.as_ref(), |value| {
        interval(value, "slo_p95")
    })?;
    layer.set(
        "slo_error_rate",
        &mut args.slo_error_rate,
        config.slo_error_rate,
        |value| field("slo_error_rate", ensure_ratio(value)),
    )?;
    if !is_cli(matches, "min_throughput_ratio")
        && let Some(ratio) = config.min_throughput_ratio
    {
        args.min_throughput_ratio = Some(field("min_throughput_ratio", ensure_ratio(ratio))?);
    }
    layer.set("breach_mode", &mut args.breach_mode, config.breach_mode, Ok)?;

    layer.set("spikes", &mut args.spikes, config.spikes, |value| {
        positive_usize(value, "spikes")
    })?;
    layer.set(
        "spike_multiplier",
        &mut args.spike_multiplier,
        config.spike_multiplier,
        |value| field("spike_multiplier", ensure_positive_f64(value)),
    )?;
    layer.set(
        "spike_hold",
        &mut args.spike_hold,
        config.spike_hold.as_ref(),
        |value| hold(value, "spike_hold"),
    )?;
    layer.set(
        "spike_recover_fraction",
        &mut args.spike_recover_fraction,
        config.spike_recover_fraction,
        |value| field("spike_recover_fraction", ensure_fraction(value)),
    )?;
    layer.set(
        "spike_recover_hold",
        &mut args.spike_recover_hold,
        config.spike_recover_hold.as_ref(),
        |value| hold(value, "spike_recover_hold"),
    )?;
    layer.set(
        "settle_hold",
        &mut args.settle_hold,
        config.settle_hold.as_ref(),
        |value| hold(value, "settle_hold"),
    )?;

    layer.set(
        "soak_fraction",
        &mut args.soak_fraction,
        config.soak_fraction,
        |value| field("soak_fraction", ensure_fraction(value)),
    )?;
    layer.set(
        "soak_duration",
        &mut args.soak_duration,
        config.soak_duration.as_ref(),
        |value| hold(value, "soak_duration"),
    )?;
    layer.set(
        "soak_log_interval",
        &mut args.soak_log_interval,
        config.soak_log_interval.as_ref(),
        |value| interval(value, "soak_log_interval"),
    )?;
    layer.set(
        "soak_low_rate_ratio",
        &mut args.soak_low_rate_ratio,
        config.soak_low_rate_ratio,
        |value| field("soak_low_rate_ratio", ensure_ratio(value)),
    )?;

    layer.set(
        "settle_delay",
        &mut args.settle_delay,
        config.settle_delay.as_ref(),
        |value| hold(value, "settle_delay"),
    )?;
    layer.set(
        "start_stagger",
        &mut args.start_stagger,
        config.start_stagger.as_ref(),
        |value| hold(value, "start_stagger"),
    )?;
    layer.set(
        "drain_grace",
        &mut args.drain_grace,
        config.drain_grace.as_ref(),
        |value| hold(value, "drain_grace"),
    )?;
    layer.set(
        "ready_timeout",
        &mut args.ready_timeout,
        config.ready_timeout.as_ref(),
        |value| hold(value, "ready_timeout"),
    )?;

    layer.set(
        "auth_attempts",
        &mut args.auth_attempts,
        config.auth_attempts,
        |value| positive_usize(value, "auth_attempts"),
    )?;
    layer.set(
        "confirm_attempts",
        &mut args.confirm_attempts,
        config.confirm_attempts,
        |value| positive_usize(value, "confirm_attempts"),
    )?;
    layer.set(
        "max_frame_bytes",
        &mut args.max_frame_bytes,
        config.max_frame_bytes,
        |value| positive_usize(value, "max_frame_bytes"),
    )?;
    layer.set(
        "latency_samples",
        &mut args.latency_samples,
        config.latency_samples,
        |value| positive_usize(value, "latency_samples"),
    )?;

    if !is_cli(matches, "save_to")
        && let Some(path) = config.save_to.as_ref()
    {
        args.save_to = Some(path.clone());
    }

    Ok(())
}

struct Layer<'matches> {
    matches: &'matches ArgMatches,
}

impl Layer<'_> {
    /// Overwrites `target` with the converted config value unless the
    /// command line already set it.
    fn set<T, V>(
        &self,
        name: &str,
        target: &mut T,
        value: Option<V>,
        convert: impl FnOnce(V) -> AppResult<T>,
    ) -> AppResult<()> {
        if is_cli(self.matches, name) {
            return Ok(());
        }
        if let Some(value) = value {
            *target = convert(value)?;
        }
        Ok(())
    }

    fn is_explicit(&self, name: &str) -> bool {
        matches!(
            self.matches.value_source(name),
            Some(ValueSource::CommandLine | ValueSource::EnvVariable)
        )
    }
}

fn is_cli(matches: &ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(ValueSource::CommandLine)
}

fn invalid(name: &str, source: ValidationError) -> AppError {
    AppError::config(ConfigError::InvalidField {
        field: name.to_owned(),
        source,
    })
}

fn field<T>(name: &str, result: Result<T, ValidationError>) -> AppResult<T> {
    result.map_err(|source| invalid(name, source))
}

fn positive_usize(value: usize, name: &str) -> AppResult<PositiveUsize> {
    PositiveUsize::try_from(value).map_err(|err| {
        AppError::config(ConfigError::FieldMustBePositive {
            field: name.to_owned(),
            source: err,
        })
    })
}

/// Duration that may be zero to skip a phase.
fn hold(value: &DurationValue, name: &str) -> AppResult<std::time::Duration> {
    field(name, value.to_duration())
}

/// Duration that must be positive.
fn interval(value: &DurationValue, name: &str) -> AppResult<std::time::Duration> {
    field(name, value.to_duration().and_then(ensure_nonzero_duration))
}
