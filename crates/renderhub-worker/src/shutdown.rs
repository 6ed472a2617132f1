use tokio::sync::watch;

/// Resolve once the shutdown flag is raised or its sender is gone.
pub(crate) async fn shutdown_requested(cancel: &mut watch::Receiver<bool>) {
    while !*cancel.borrow_and_update() {
        if cancel.changed().await.is_err() {
            return;
        }
    }
}
