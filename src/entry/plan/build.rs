use std::path::PathBuf;

use clap::ArgMatches;

use crate::agent::AgentSettings;
use crate::args::{Command, HarnessArgs};
use crate::error::{AppError, AppResult, ValidationError};
use crate::harness::HarnessConfig;
use crate::scenario::{ScenarioPlan, ScenarioSettings};
use crate::transport::Endpoint;

use super::types::{ProbeSettings, RunPlan, RunSettings};

pub(crate) fn build_plan(mut args: HarnessArgs, matches: &ArgMatches) -> AppResult<RunPlan> {
    apply_config(&mut args, matches)?;

    let token = resolve_token(&args)?;
    let host = args.host.trim();
    if host.is_empty() {
        return Err(AppError::validation(ValidationError::EmptyHost));
    }
    let endpoint = Endpoint::new(host, args.port);
    let use_tls = !args.no_tls;

    if let Some(Command::Probe(probe)) = args.command.take() {
        return Ok(RunPlan::Probe(ProbeSettings {
            endpoint,
            use_tls,
            token,
            batches: probe.batches.get(),
            batch_size: probe.batch_size.get(),
            interval: probe.interval,
            auth_attempts: args.auth_attempts.get(),
            confirm_attempts: args.confirm_attempts.get(),
            max_frame_bytes: args.max_frame_bytes.get(),
        }));
    }

    let plan = ScenarioPlan::preset(args.scenario, &scenario_settings(&args));
    let harness = HarnessConfig {
        agents: args.agents.get(),
        events_per_batch: args.event_batch.get(),
        latency_samples: args.latency_samples.get(),
        agent: agent_settings(&args, token),
        ready_timeout: (!args.ready_timeout.is_zero()).then_some(args.ready_timeout),
        drain_grace: args.drain_grace,
    };
    Ok(RunPlan::Scenario(RunSettings {
        endpoint,
        use_tls,
        scenario: args.scenario,
        plan,
        harness,
        save_to: args.save_to.map(PathBuf::from),
    }))
}

fn apply_config(args: &mut HarnessArgs, matches: &ArgMatches) -> AppResult<()> {
    if let Some(config) = crate::config::load_config(args.config.as_deref())? {
        crate::config::apply_config(args, matches, &config)?;
    }
    Ok(())
}

fn resolve_token(args: &HarnessArgs) -> AppResult<String> {
    args.token
        .as_deref()
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| AppError::validation(ValidationError::MissingToken))
}

fn scenario_settings(args: &HarnessArgs) -> ScenarioSettings {
    ScenarioSettings {
        target_eps: args.target_eps,
        warmup: args.warmup,
        warmup_fraction: args.warmup_fraction,
        step_window: args.step_window,
        step_increase: args.step_increase,
        max_steps: args.max_steps.get(),
        slo_p95: args.slo_p95.as_secs_f64(),
        slo_error_rate: args.slo_error_rate,
        min_throughput_ratio: args.min_throughput_ratio,
        breach_mode: args.breach_mode,
        spikes: args.spikes.get(),
        spike_multiplier: args.spike_multiplier,
        spike_hold: args.spike_hold,
        spike_recover_fraction: args.spike_recover_fraction,
        spike_recover_hold: args.spike_recover_hold,
        settle_hold: args.settle_hold,
        soak_fraction: args.soak_fraction,
        soak_duration: args.soak_duration,
        soak_log_interval: args.soak_log_interval,
        soak_low_rate_ratio: args.soak_low_rate_ratio,
        settle_delay: args.settle_delay,
    }
}

fn agent_settings(args: &HarnessArgs, token: String) -> AgentSettings {
    let mut settings = AgentSettings::new(token);
    settings.auth_read_attempts = args.auth_attempts.get();
    settings.confirm_read_attempts = args.confirm_attempts.get();
    settings.start_stagger = args.start_stagger;
    settings.max_frame_bytes = Some(args.max_frame_bytes.get());
    settings
}
