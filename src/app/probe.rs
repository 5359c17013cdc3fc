use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, warn};

use crate::agent::AgentIdentity;
use crate::entry::ProbeSettings;
use crate::error::{AppError, AppResult, SessionError, ValidationError};
use crate::transport::{BoxedStream, Connector, Session, TcpConnector};
use crate::wire::{build_event_batch, build_identity_message, is_confirm};

/// Confirm latency of every probe batch, `None` where no confirm arrived.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ProbeReport {
    pub(crate) latencies: Vec<Option<Duration>>,
}

impl ProbeReport {
    fn failed(&self) -> u64 {
        let failed = self.latencies.iter().filter(|latency| latency.is_none()).count();
        u64::try_from(failed).unwrap_or(u64::MAX)
    }
}

pub(crate) async fn run_probe(settings: ProbeSettings) -> AppResult<()> {
    let connector = TcpConnector::new(settings.endpoint.clone(), settings.use_tls)?;
    info!(
        "Probing {} (tls: {}) with {} batch(es) of {} event(s)",
        settings.endpoint, settings.use_tls, settings.batches, settings.batch_size
    );
    let report = probe(&connector, &settings).await?;

    for (index, latency) in report.latencies.iter().enumerate() {
        match latency {
            Some(latency) => println!(
                "batch {}: confirmed in {:.3}s",
                index.saturating_add(1),
                latency.as_secs_f64()
            ),
            None => println!("batch {}: no confirm", index.saturating_add(1)),
        }
    }

    let failed = report.failed();
    if failed > 0 {
        return Err(AppError::validation(ValidationError::ProbeIncomplete {
            failed,
            total: settings.batches,
        }));
    }
    Ok(())
}

/// Connects one agent, authenticates, then sends the batches one at a time,
/// each waiting for its confirm before the interval starts.
///
/// A batch whose confirm does not show up within the read bound is recorded
/// as missing; transport failures end the probe.
pub(crate) async fn probe(
    connector: &dyn Connector,
    settings: &ProbeSettings,
) -> Result<ProbeReport, SessionError> {
    let identity = AgentIdentity::generate();
    let stream: BoxedStream = connector.connect().await?;
    let mut session = Session::new(stream, Some(settings.max_frame_bytes));
    session
        .authenticate(
            &build_identity_message(&identity.name, &identity.peer_id, &settings.token),
            settings.auth_attempts,
        )
        .await?;
    info!("Probe agent {} approved", identity.name);

    let mut report = ProbeReport::default();
    for confirmation_id in 1..=settings.batches {
        if confirmation_id > 1 && !settings.interval.is_zero() {
            tokio::time::sleep(settings.interval).await;
        }
        let batch = build_event_batch(settings.batch_size, confirmation_id).map_err(|source| {
            SessionError::Send {
                context: "event batch",
                source,
            }
        })?;
        let sent_at = Instant::now();
        session.send(&batch, "event batch").await?;
        let latency = wait_confirm(&mut session, settings.confirm_attempts)
            .await?
            .then(|| sent_at.elapsed());
        if latency.is_none() {
            warn!(
                "Batch {} got no confirm within {} message(s)",
                confirmation_id, settings.confirm_attempts
            );
        }
        report.latencies.push(latency);
    }
    Ok(report)
}

async fn wait_confirm(
    session: &mut Session<BoxedStream>,
    max_reads: usize,
) -> Result<bool, SessionError> {
    for _ in 0..max_reads {
        if is_confirm(&session.recv().await?) {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{AuthReply, FakeConnector, ServerBehavior, run_paused_test};
    use crate::transport::Endpoint;

    fn settings(batches: u64) -> ProbeSettings {
        ProbeSettings {
            endpoint: Endpoint::new("127.0.0.1", 8444),
            use_tls: false,
            token: "token".to_owned(),
            batches,
            batch_size: 5,
            interval: Duration::from_secs(5),
            auth_attempts: 3,
            confirm_attempts: 3,
            max_frame_bytes: 1024 * 1024,
        }
    }

    #[test]
    fn probe_reports_each_confirm() -> AppResult<()> {
        run_paused_test(async {
            let connector = FakeConnector::new(|_| ServerBehavior {
                confirm_delay: Duration::from_millis(40),
                ..ServerBehavior::default()
            });
            let started = Instant::now();
            let report = probe(&connector, &settings(3)).await?;

            let checks = [
                (report.latencies.len() == 3, "three batches"),
                (report.failed() == 0, "no failures"),
                (
                    report
                        .latencies
                        .iter()
                        .flatten()
                        .all(|latency| {
                            (Duration::from_millis(40)..=Duration::from_millis(41))
                                .contains(latency)
                        }),
                    "confirm latency",
                ),
                (started.elapsed() >= Duration::from_secs(10), "interval between batches"),
            ];
            for (ok, label) in checks {
                if !ok {
                    return Err(AppError::validation(format!("Unexpected {label}: {report:?}")));
                }
            }
            Ok(())
        })
    }

    #[test]
    fn probe_records_missing_confirms() -> AppResult<()> {
        run_paused_test(async {
            let connector = FakeConnector::new(|_| ServerBehavior {
                drop_every: Some(2),
                ..ServerBehavior::default()
            });
            let report = probe(&connector, &settings(3)).await?;
            let missing: Vec<bool> = report.latencies.iter().map(Option::is_none).collect();
            if missing != [false, true, false] || report.failed() != 1 {
                return Err(AppError::validation(format!("Unexpected report: {report:?}")));
            }
            Ok(())
        })
    }

    #[test]
    fn probe_fails_without_approval() -> AppResult<()> {
        run_paused_test(async {
            let connector = FakeConnector::new(|_| ServerBehavior {
                auth: AuthReply::Deny,
                ..ServerBehavior::default()
            });
            match probe(&connector, &settings(1)).await {
                Err(SessionError::AuthTimeout { attempts: 3 }) => Ok(()),
                other => Err(AppError::validation(format!(
                    "Expected auth timeout, got {other:?}"
                ))),
            }
        })
    }
}
