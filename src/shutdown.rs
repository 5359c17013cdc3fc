use tokio::sync::watch;

/// Run-wide stop flag. Flips to `true` once and stays there.
pub type ShutdownSender = watch::Sender<bool>;
pub type ShutdownReceiver = watch::Receiver<bool>;

#[must_use]
pub fn shutdown_channel() -> (ShutdownSender, ShutdownReceiver) {
    watch::channel(false)
}

pub fn request_shutdown(shutdown_tx: &ShutdownSender) {
    shutdown_tx.send_replace(true);
}

#[must_use]
pub fn is_shutdown(shutdown_rx: &ShutdownReceiver) -> bool {
    *shutdown_rx.borrow()
}

/// Resolves once stop is requested or the sender is gone.
pub async fn wait_for_shutdown(shutdown_rx: &mut ShutdownReceiver) {
    if shutdown_rx.wait_for(|stopped| *stopped).await.is_err() {
        tracing::trace!("Shutdown sender dropped");
    }
}
