use std::time::Duration;

use crate::harness::RunReport;
use crate::scenario::format_hms;

use crate::entry::RunSettings;

pub(crate) fn selection_lines(settings: &RunSettings) -> Vec<String> {
    let harness = &settings.harness;
    vec![
        "Selections:".to_owned(),
        format!("endpoint: {}", settings.endpoint),
        format!("tls: {}", settings.use_tls),
        format!("scenario: {}", settings.scenario.as_str()),
        format!("agents: {}", harness.agents),
        format!("event_batch: {}", harness.events_per_batch),
        format!("target_eps: {:.0}", settings.plan.target_eps),
        format!(
            "phases: {}",
            settings
                .plan
                .phases
                .iter()
                .map(|phase| phase.name())
                .collect::<Vec<_>>()
                .join(" -> ")
        ),
        format!("settle_delay: {}", format_duration(settings.plan.settle_delay)),
        format!(
            "ready_timeout: {}",
            harness
                .ready_timeout
                .map_or_else(|| "none".to_owned(), format_duration)
        ),
        format!(
            "save_to: {}",
            settings
                .save_to
                .as_ref()
                .map_or_else(|| "none".to_owned(), |path| path.display().to_string())
        ),
    ]
}

pub(crate) fn summary_lines(report: &RunReport) -> Vec<String> {
    let summary = &report.summary;
    let mut lines = vec![
        "Summary:".to_owned(),
        format!("agents: {} ({} approved)", report.agents, report.approved),
        format!("event_batch: {}", report.events_per_batch),
        format!("batches_sent: {}", report.batches_sent()),
        format!("batches_confirmed: {}", report.batches_confirmed()),
        format!("target_eps: {:.0}", summary.target_eps),
        format!("capacity_eps: {:.0}", summary.capacity_eps),
        format!(
            "best_sustainable_eps: {}",
            summary
                .best_sustainable_eps
                .map_or_else(|| "none".to_owned(), |eps| format!("{eps:.0}"))
        ),
        format!("best_confirmed_eps: {:.0}", summary.best_confirmed_eps),
        format!(
            "breached_at_step: {}",
            summary
                .breached_at
                .map_or_else(|| "none".to_owned(), |step| step.to_string())
        ),
    ];
    if let Some(step) = summary.last_step {
        lines.push(format!(
            "last_step: #{} target={:.0} sent={} confirmed={} p95={:.3}s",
            step.step, step.target_eps, step.sent, step.confirmed, step.p95
        ));
    }
    if summary.low_rate_windows > 0 {
        lines.push(format!("low_rate_soak_windows: {}", summary.low_rate_windows));
    }
    for (kind, count) in report.failures() {
        lines.push(format!("agent_failures[{kind}]: {count}"));
    }
    if report.aborted > 0 {
        lines.push(format!("aborted_agents: {}", report.aborted));
    }
    if summary.interrupted {
        lines.push("interrupted: true".to_owned());
    }
    lines
}

fn format_duration(duration: Duration) -> String {
    if duration.subsec_millis() == 0 {
        format_hms(duration)
    } else {
        format!("{}ms", duration.as_millis())
    }
}
