use std::sync::Arc;

use tracing::{error, info};

use crate::entry::RunSettings;
use crate::error::AppResult;
use crate::harness::{Harness, RunReport};
use crate::shutdown::{shutdown_channel, wait_for_shutdown};
use crate::system::shutdown_handlers::setup_signal_shutdown_handler;
use crate::system::{selection_lines, summary_lines};
use crate::transport::{Connector, TcpConnector};

use super::export::append_csv;

/// Runs the selected scenario against the configured endpoint, prints the
/// summary and appends the results row when asked to.
pub(crate) async fn run_scenario(settings: RunSettings) -> AppResult<RunReport> {
    let connector: Arc<dyn Connector> =
        Arc::new(TcpConnector::new(settings.endpoint.clone(), settings.use_tls)?);
    for line in selection_lines(&settings) {
        info!("{}", line);
    }

    let harness = Harness::new(
        settings.harness.clone(),
        settings.plan.clone(),
        connector,
    );
    let handle = harness.handle();

    let (signal_tx, mut signal_rx) = shutdown_channel();
    let signal_task = setup_signal_shutdown_handler(&signal_tx);
    let bridge_task = tokio::spawn(async move {
        wait_for_shutdown(&mut signal_rx).await;
        if !handle.stop() {
            tracing::debug!("Harness already finished");
        }
    });

    let report = harness.run().await;
    signal_task.abort();
    bridge_task.abort();

    for line in summary_lines(&report) {
        println!("{}", line);
    }

    if let Some(path) = settings.save_to.as_deref() {
        match append_csv(path, &report).await {
            Ok(()) => info!("Results appended to {}", path.display()),
            Err(err) => {
                error!("Failed to write results to {}: {}", path.display(), err);
                return Err(err.into());
            }
        }
    }
    Ok(report)
}
