use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::shutdown::{ShutdownReceiver, is_shutdown, wait_for_shutdown};
use crate::state::SharedState;

use super::plan::{
    CapacityMeasure, Phase, RampPhase, ScenarioPlan, SettlePhase, SoakPhase, SpikePhase,
    WarmupPhase,
};
use super::slo::WindowStats;
use super::summary::{PhaseReport, ScenarioSummary, StepReport};

/// Rate target currently held by the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseRecord {
    pub name: &'static str,
    pub target_eps: f64,
    pub started: Instant,
    pub deadline: Instant,
}

/// Stop was requested while a phase was running.
#[derive(Debug, Clone, Copy)]
struct Interrupted;

type PhaseResult = Result<(), Interrupted>;

/// Drives the shared rate budget through the plan's phases. Never touches
/// connections; everything it knows comes from [`SharedState`] windows.
pub struct ScenarioController {
    plan: ScenarioPlan,
    state: Arc<SharedState>,
    shutdown_rx: ShutdownReceiver,
    phase_tx: watch::Sender<Option<PhaseRecord>>,
    capacity: f64,
    summary: ScenarioSummary,
}

impl ScenarioController {
    #[must_use]
    pub fn new(plan: ScenarioPlan, state: Arc<SharedState>, shutdown_rx: ShutdownReceiver) -> Self {
        let (phase_tx, _) = watch::channel(None);
        let summary = ScenarioSummary::new(plan.target_eps);
        Self {
            capacity: plan.target_eps,
            plan,
            state,
            shutdown_rx,
            phase_tx,
            summary,
        }
    }

    /// Follows the phase currently in progress; `None` before the first
    /// rate change and after the last phase.
    #[must_use]
    pub fn phase_watch(&self) -> watch::Receiver<Option<PhaseRecord>> {
        self.phase_tx.subscribe()
    }

    pub async fn run(mut self) -> ScenarioSummary {
        info!(
            "Scenario starting: {} phase(s), target {:.0} EPS",
            self.plan.phases.len(),
            self.plan.target_eps
        );
        let phases = self.plan.phases.clone();
        for phase in phases {
            let result = match phase {
                Phase::Warmup(warmup) => self.warmup(warmup).await,
                Phase::Ramp(ramp) => self.ramp(ramp).await,
                Phase::Spike(spike) => self.spike(spike).await,
                Phase::Settle(settle) => self.settle(settle).await,
                Phase::Soak(soak) => self.soak(soak).await,
            };
            if result.is_err() {
                info!("Scenario stopped during {}", phase.name());
                self.summary.interrupted = true;
                break;
            }
        }

        self.phase_tx.send_replace(None);
        self.summary.capacity_eps = self.capacity;
        info!("Scenario complete");
        self.summary
    }

    async fn warmup(&mut self, phase: WarmupPhase) -> PhaseResult {
        if phase.hold.is_zero() {
            debug!("Warm-up skipped");
            return Ok(());
        }
        let eps = self.plan.target_eps * phase.fraction;
        info!(
            "Warm-up: setting total EPS to {:.0} for {}",
            eps,
            format_hms(phase.hold)
        );
        self.apply_rate("warmup", eps, phase.hold).await?;
        self.hold(phase.hold).await?;
        let stats = self.take_window(eps);
        log_window("Warm-up", &stats);
        self.record("warmup", None, eps, stats, None);
        Ok(())
    }

    async fn ramp(&mut self, phase: RampPhase) -> PhaseResult {
        let start = self.plan.target_eps * phase.start_fraction;
        let mut step_eps = start;
        let mut best = match phase.capacity {
            CapacityMeasure::StepTarget => Some(start),
            CapacityMeasure::ConfirmedEps => None,
        };

        for step in 1..=phase.max_steps {
            step_eps *= 1.0 + phase.increase;
            info!(
                "Step {}: increased total EPS to {:.0}, running for {}",
                step,
                step_eps,
                format_hms(phase.window)
            );
            if let Err(interrupted) = self.ramp_step(&phase, step, step_eps).await {
                self.finish_ramp(best);
                return Err(interrupted);
            }
            let Some(stats) = self.summary.phases.last().map(|report| report.stats) else {
                break;
            };

            let verdict = phase.policy.evaluate(&stats);
            if let Some(report) = self.summary.phases.last_mut() {
                report.breached = Some(verdict.breached);
            }
            if verdict.breached {
                warn!(
                    "SLO breached at step {} (target {:.0} EPS, confirmed {:.0} EPS = {:.1}% of target, p95={:.3}s, err_rate={:.3}; {}). Using previous step as capacity.",
                    step,
                    step_eps,
                    stats.confirmed_eps,
                    percent_of(stats.confirmed_eps, step_eps),
                    stats.p95,
                    stats.error_rate,
                    verdict.reasons()
                );
                self.summary.breached_at = Some(step);
                break;
            }

            best = Some(match phase.capacity {
                CapacityMeasure::StepTarget => step_eps,
                CapacityMeasure::ConfirmedEps => best.map_or(stats.confirmed_eps, |current| {
                    current.max(stats.confirmed_eps)
                }),
            });
            if step == phase.max_steps {
                info!("Reached maximum steps ({})", phase.max_steps);
            }
        }

        self.finish_ramp(best);
        Ok(())
    }

    async fn ramp_step(&mut self, phase: &RampPhase, step: usize, step_eps: f64) -> PhaseResult {
        self.apply_rate("ramp", step_eps, phase.window).await?;
        self.hold(phase.window).await?;
        let stats = self.take_window(step_eps);
        info!(
            "Step result: p95={:.3}s, mean_lat={:.3}s, sent={}, confirms={}, confirmed_eps={:.0}, errors={} (err_rate={:.3})",
            stats.p95,
            stats.mean_latency,
            stats.batches_sent,
            stats.confirms,
            stats.confirmed_eps,
            stats.errors,
            stats.error_rate
        );
        self.summary.last_step = Some(StepReport {
            step,
            target_eps: step_eps,
            sent: stats.batches_sent,
            confirmed: stats.confirms,
            p95: stats.p95,
        });
        self.summary.best_confirmed_eps = self.summary.best_confirmed_eps.max(stats.confirmed_eps);
        self.record("ramp", Some(step), step_eps, stats, Some(false));
        Ok(())
    }

    fn finish_ramp(&mut self, best: Option<f64>) {
        self.summary.best_sustainable_eps = best;
        let Some(eps) = best.filter(|eps| *eps > 0.0) else {
            warn!(
                "No sustainable step found; later phases use the target of {:.0} EPS",
                self.plan.target_eps
            );
            return;
        };
        info!("Best sustainable capacity: {:.0} EPS", eps);
        self.capacity = eps;
    }

    async fn spike(&mut self, phase: SpikePhase) -> PhaseResult {
        for cycle in 1..=phase.count {
            let eps = self.capacity * phase.multiplier;
            info!(
                "Spike #{}: setting total EPS to {:.1}x of {:.0} for {}",
                cycle,
                phase.multiplier,
                self.capacity,
                format_hms(phase.hold)
            );
            self.apply_rate("spike", eps, phase.hold).await?;
            self.hold(phase.hold).await?;
            let stats = self.take_window(eps);
            log_window("Spike", &stats);
            let verdict = phase.policy.evaluate(&stats);
            if verdict.breached {
                warn!(
                    "Spike #{} exceeded SLOs ({}); continuing",
                    cycle,
                    verdict.reasons()
                );
            }
            self.record("spike", Some(cycle), eps, stats, Some(verdict.breached));

            if let Some(recover) = phase.recover {
                let recover_eps = self.capacity * recover.fraction;
                info!(
                    "Spike #{}: mitigate load to {:.0}% of {:.0} for {}",
                    cycle,
                    recover.fraction * 100.0,
                    self.capacity,
                    format_hms(recover.hold)
                );
                self.apply_rate("recover", recover_eps, recover.hold).await?;
                self.hold(recover.hold).await?;
                let recover_stats = self.take_window(recover_eps);
                log_window("Recovery", &recover_stats);
                self.record("recover", Some(cycle), recover_eps, recover_stats, None);
            }
        }
        Ok(())
    }

    async fn settle(&mut self, phase: SettlePhase) -> PhaseResult {
        let eps = self.capacity;
        info!(
            "Settle: returning to {:.0} EPS for {}",
            eps,
            format_hms(phase.hold)
        );
        self.apply_rate("settle", eps, phase.hold).await?;
        self.hold(phase.hold).await?;
        let stats = self.take_window(eps);
        log_window("Settle", &stats);
        self.record("settle", None, eps, stats, None);
        Ok(())
    }

    async fn soak(&mut self, phase: SoakPhase) -> PhaseResult {
        let eps = self.capacity * phase.fraction;
        info!(
            "Soak: setting total EPS to {:.0} for {}",
            eps,
            format_hms(phase.duration)
        );
        self.apply_rate("soak", eps, phase.duration).await?;

        let interval = if phase.log_interval.is_zero() {
            phase.duration
        } else {
            phase.log_interval
        };
        let mut remaining = phase.duration;
        let mut window = 0usize;
        while !remaining.is_zero() {
            let chunk = remaining.min(interval);
            self.hold(chunk).await?;
            remaining = remaining.saturating_sub(chunk);
            window = window.saturating_add(1);

            let stats = self.take_window(eps);
            info!(
                "Soak window {}: confirms={}, errors={} (err_rate={:.3}), sent_eps={:.0}, {} time left",
                window,
                stats.confirms,
                stats.errors,
                stats.error_rate,
                stats.sent_eps,
                format_hms(remaining)
            );
            if stats.sent_eps < eps * phase.low_rate_ratio {
                warn!(
                    "Low send rate detected: {:.0} EPS sent vs {:.0} target ({:.1}%)",
                    stats.sent_eps,
                    eps,
                    percent_of(stats.sent_eps, eps)
                );
                self.summary.low_rate_windows = self.summary.low_rate_windows.saturating_add(1);
            }
            self.record("soak", Some(window), eps, stats, None);
        }
        Ok(())
    }

    async fn apply_rate(&self, name: &'static str, eps: f64, hold: Duration) -> PhaseResult {
        let mut shutdown_rx = self.shutdown_rx.clone();
        tokio::select! {
            () = self.state.set_total_rate(eps, self.plan.settle_delay) => {}
            () = wait_for_shutdown(&mut shutdown_rx) => return Err(Interrupted),
        }
        let started = Instant::now();
        self.phase_tx.send_replace(Some(PhaseRecord {
            name,
            target_eps: self.state.rate_total(),
            started,
            deadline: started.checked_add(hold).unwrap_or(started),
        }));
        Ok(())
    }

    async fn hold(&self, duration: Duration) -> PhaseResult {
        if is_shutdown(&self.shutdown_rx) {
            return Err(Interrupted);
        }
        let mut shutdown_rx = self.shutdown_rx.clone();
        tokio::select! {
            () = tokio::time::sleep(duration) => Ok(()),
            () = wait_for_shutdown(&mut shutdown_rx) => Err(Interrupted),
        }
    }

    fn take_window(&self, target_eps: f64) -> WindowStats {
        let snapshot = self.state.snapshot_and_reset();
        WindowStats::from_snapshot(&snapshot, self.state.events_per_batch(), target_eps)
    }

    fn record(
        &mut self,
        phase: &'static str,
        step: Option<usize>,
        target_eps: f64,
        stats: WindowStats,
        breached: Option<bool>,
    ) {
        self.summary.phases.push(PhaseReport {
            phase,
            step,
            target_eps,
            stats,
            breached,
        });
    }
}

fn log_window(label: &str, stats: &WindowStats) {
    info!(
        "{} window: p95={:.3}s, sent={}, confirms={}, confirmed_eps={:.0}, errors={} (err_rate={:.3})",
        label,
        stats.p95,
        stats.batches_sent,
        stats.confirms,
        stats.confirmed_eps,
        stats.errors,
        stats.error_rate
    );
}

const fn percent_of(value: f64, of: f64) -> f64 {
    if of > 0.0 { value * 100.0 / of } else { 0.0 }
}

/// `HH:MM:SS`, hours unbounded.
#[must_use]
pub fn format_hms(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
