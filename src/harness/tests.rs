use super::*;
use crate::agent::AgentSettings;
use crate::error::{AppError, AppResult};
use crate::scenario::{
    BreachMode, BreachPolicy, CapacityMeasure, Phase, RampPhase, ScenarioPlan, WarmupPhase,
};
use crate::test_support::{FakeConnector, RefusingConnector, ServerBehavior, run_paused_test};
use crate::transport::Connector;
use std::sync::Arc;
use std::time::Duration;

fn test_config(agents: usize) -> HarnessConfig {
    let mut agent = AgentSettings::new("token");
    agent.start_stagger = Duration::ZERO;
    HarnessConfig::new(agents, 10, agent)
}

fn default_policy() -> BreachPolicy {
    BreachPolicy {
        max_p95: Some(0.5),
        max_error_rate: Some(0.01),
        min_throughput_ratio: None,
        mode: BreachMode::Any,
    }
}

fn warmup_plan(hold: Duration) -> ScenarioPlan {
    ScenarioPlan {
        target_eps: 100.0,
        settle_delay: Duration::ZERO,
        phases: vec![Phase::Warmup(WarmupPhase {
            fraction: 0.5,
            hold,
        })],
    }
}

#[test]
fn healthy_server_paces_agents_to_their_share() -> AppResult<()> {
    run_paused_test(async {
        let connector: Arc<dyn Connector> = Arc::new(FakeConnector::healthy());
        let harness = Harness::new(
            test_config(4),
            warmup_plan(Duration::from_secs(5)),
            connector,
        );
        let report = harness.run().await;

        let stats = report
            .summary
            .phases
            .first()
            .map(|phase| phase.stats)
            .ok_or_else(|| AppError::validation("Missing warm-up window"))?;
        let per_agent_ok = report
            .outcomes
            .iter()
            .all(|outcome| (5..=9).contains(&outcome.batches_confirmed));
        let checks = [
            ((20..=32).contains(&stats.confirms), "aggregate confirms near 24"),
            (stats.errors == 0, "no errors"),
            (stats.error_rate.abs() < f64::EPSILON, "zero error rate"),
            (!default_policy().evaluate(&stats).breached, "no breach"),
            (per_agent_ok, "per-agent confirms near 6"),
            (report.outcomes.len() == 4 && report.aborted == 0, "all agents drained"),
            (report.approved == 4, "all agents approved"),
            (report.failures().is_empty(), "no agent failures"),
        ];
        for (ok, label) in checks {
            if !ok {
                return Err(AppError::validation(format!(
                    "{label}: {stats:?} {:?}",
                    report.outcomes
                )));
            }
        }
        Ok(())
    })
}

#[test]
fn dropped_confirms_breach_the_first_ramp_step() -> AppResult<()> {
    run_paused_test(async {
        let connector: Arc<dyn Connector> = Arc::new(FakeConnector::new(|_| ServerBehavior {
            drop_every: Some(5),
            ..ServerBehavior::default()
        }));
        let plan = ScenarioPlan {
            target_eps: 100.0,
            settle_delay: Duration::ZERO,
            phases: vec![Phase::Ramp(RampPhase {
                start_fraction: 0.5,
                increase: 0.1,
                window: Duration::from_secs(10),
                max_steps: 5,
                policy: default_policy(),
                capacity: CapacityMeasure::ConfirmedEps,
            })],
        };
        let report = Harness::new(test_config(4), plan, connector).run().await;

        let stats = report
            .summary
            .phases
            .first()
            .map(|phase| phase.stats)
            .ok_or_else(|| AppError::validation("Missing ramp window"))?;
        let checks = [
            (report.summary.breached_at == Some(1), "breach at first step"),
            (report.summary.phases.len() == 1, "ramp stopped"),
            (report.summary.best_sustainable_eps.is_none(), "nothing sustainable"),
            (stats.errors == 4, "one error per agent"),
            (
                stats.error_rate >= 0.19 && stats.error_rate <= 0.26,
                "error rate near 0.2",
            ),
            (
                report.failures().get("missing-ack") == Some(&4),
                "missing ack failures",
            ),
        ];
        for (ok, label) in checks {
            if !ok {
                return Err(AppError::validation(format!(
                    "{label}: {stats:?} {:?}",
                    report.summary
                )));
            }
        }
        Ok(())
    })
}

#[test]
fn stop_command_interrupts_and_drains() -> AppResult<()> {
    run_paused_test(async {
        let connector: Arc<dyn Connector> = Arc::new(FakeConnector::healthy());
        let harness = Harness::new(
            test_config(4),
            warmup_plan(Duration::from_secs(300)),
            connector,
        );
        let handle = harness.handle();
        let task = tokio::spawn(harness.run());

        tokio::time::sleep(Duration::from_secs(10)).await;
        let phase = handle.current_phase();
        let rate = handle.rate_total();
        if !handle.stop() {
            return Err(AppError::validation("Stop was not delivered"));
        }
        let report = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .map_err(|err| AppError::validation(format!("Harness kept running: {err}")))??;

        let checks = [
            (
                phase.is_some_and(|record| record.name == "warmup"),
                "warm-up visible to handle",
            ),
            ((rate - 50.0).abs() < f64::EPSILON, "rate visible to handle"),
            (report.summary.interrupted, "interrupted"),
            (report.outcomes.len() == 4, "outcomes collected"),
            (
                report.outcomes.iter().all(|outcome| outcome.failure.is_none()),
                "clean shutdown",
            ),
            (!handle.stop(), "handle reports finished harness"),
        ];
        for (ok, label) in checks {
            if !ok {
                return Err(AppError::validation(format!("{label}: {report:?}")));
            }
        }
        Ok(())
    })
}

#[test]
fn rate_command_does_not_outlive_the_run() -> AppResult<()> {
    run_paused_test(async {
        let connector: Arc<dyn Connector> = Arc::new(FakeConnector::healthy());
        let mut plan = warmup_plan(Duration::from_secs(300));
        plan.settle_delay = Duration::from_secs(30);
        let harness = Harness::new(test_config(2), plan, connector);
        let handle = harness.handle();
        let state = Arc::clone(harness.state());
        let task = tokio::spawn(harness.run());

        tokio::time::sleep(Duration::from_secs(2)).await;
        if !handle.send(ControlCommand::SetTotalRate(80.0)) {
            return Err(AppError::validation("Rate command was not delivered"));
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
        if !handle.stop() {
            return Err(AppError::validation("Stop was not delivered"));
        }
        let report = tokio::time::timeout(Duration::from_secs(10), task)
            .await
            .map_err(|err| AppError::validation(format!("Harness kept running: {err}")))??;

        let checks = [
            (report.summary.interrupted, "interrupted"),
            (!state.is_changing_rate(), "rate gate released after the run"),
        ];
        for (ok, label) in checks {
            if !ok {
                return Err(AppError::validation(format!("{label}: {report:?}")));
            }
        }
        Ok(())
    })
}

#[test]
fn commands_reconfigure_a_running_harness() -> AppResult<()> {
    run_paused_test(async {
        let fake = Arc::new(FakeConnector::healthy());
        let connector: Arc<dyn Connector> = Arc::clone(&fake) as Arc<dyn Connector>;
        let harness = Harness::new(test_config(2), warmup_plan(Duration::from_secs(20)), connector);
        let handle = harness.handle();
        let task = tokio::spawn(harness.run());

        tokio::time::sleep(Duration::from_secs(5)).await;
        let delivered = handle.send(ControlCommand::AddAgents(2))
            && handle.send(ControlCommand::SetEventsPerBatch(20));
        if !delivered {
            return Err(AppError::validation("Commands were not delivered"));
        }
        let report = task.await?;

        let checks = [
            (report.agents == 4, "agent total raised"),
            (report.approved == 4, "new agents approved"),
            (report.outcomes.len() == 4, "new agents drained"),
            (report.events_per_batch == 20, "batch size changed"),
            (
                fake.stats.connections.load(std::sync::atomic::Ordering::Acquire) == 4,
                "new connections opened",
            ),
        ];
        for (ok, label) in checks {
            if !ok {
                return Err(AppError::validation(format!("{label}: {report:?}")));
            }
        }
        Ok(())
    })
}

#[test]
fn scenario_starts_after_ready_timeout() -> AppResult<()> {
    run_paused_test(async {
        let connector: Arc<dyn Connector> = Arc::new(RefusingConnector);
        let mut config = test_config(3);
        config.ready_timeout = Some(Duration::from_secs(2));
        let report = Harness::new(config, warmup_plan(Duration::from_secs(3)), connector)
            .run()
            .await;

        let checks = [
            (report.approved == 0, "no approvals"),
            (report.failures().get("connect") == Some(&3), "connect failures"),
            (report.summary.phases.len() == 1, "warm-up still ran"),
            (!report.summary.interrupted, "not interrupted"),
        ];
        for (ok, label) in checks {
            if !ok {
                return Err(AppError::validation(format!("{label}: {report:?}")));
            }
        }
        Ok(())
    })
}
