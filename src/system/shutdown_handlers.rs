use crate::shutdown::{ShutdownSender, request_shutdown, wait_for_shutdown};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Flips `shutdown_tx` on Ctrl+C or SIGTERM. Exits on its own once the flag
/// is set elsewhere.
pub fn setup_signal_shutdown_handler(shutdown_tx: &ShutdownSender) -> tokio::task::JoinHandle<()> {
    let shutdown_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        let mut shutdown_rx = shutdown_tx.subscribe();

        #[cfg(unix)]
        let mut term_signal = match signal(SignalKind::terminate()) {
            Ok(signal) => Some(signal),
            Err(err) => {
                tracing::warn!("Failed to register SIGTERM handler: {}", err);
                None
            }
        };

        #[cfg(unix)]
        {
            tokio::select! {
                () = wait_for_shutdown(&mut shutdown_rx) => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Interrupt received, stopping");
                    request_shutdown(&shutdown_tx);
                }
                () = async {
                    if let Some(signal) = term_signal.as_mut() {
                        signal.recv().await;
                    } else {
                        std::future::pending::<()>().await;
                    }
                } => {
                    tracing::info!("SIGTERM received, stopping");
                    request_shutdown(&shutdown_tx);
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                () = wait_for_shutdown(&mut shutdown_rx) => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Interrupt received, stopping");
                    request_shutdown(&shutdown_tx);
                }
            }
        }
    })
}
