use std::path::Path;

use tokio::io::AsyncWriteExt;

use crate::harness::RunReport;

pub(crate) const CSV_HEADER: &str =
    "Agents Count,Batch Size,Sent,Confirmed,P95,Best Eps,Best Confirmed\n";

/// One results row: fleet shape, the last ramp step, and the best rates.
pub(crate) fn csv_row(report: &RunReport) -> String {
    let summary = &report.summary;
    let (sent, confirmed, p95) = summary
        .last_step
        .map_or((0, 0, 0.0), |step| (step.sent, step.confirmed, step.p95));
    format!(
        "{},{},{},{},{:.2},{:.0},{:.0}\n",
        report.agents,
        report.events_per_batch,
        sent,
        confirmed,
        p95,
        summary.best_sustainable_eps.unwrap_or(0.0),
        summary.best_confirmed_eps
    )
}

/// Appends one row to `path`, writing the header first when the file is new
/// or empty.
pub(crate) async fn append_csv(path: &Path, report: &RunReport) -> Result<(), std::io::Error> {
    let needs_header = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata.len() == 0,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => true,
        Err(err) => return Err(err),
    };
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    if needs_header {
        file.write_all(CSV_HEADER.as_bytes()).await?;
    }
    file.write_all(csv_row(report).as_bytes()).await?;
    file.flush().await?;
    Ok(())
}
