use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::switch::Shared;

/// Background task re-reading the device state.
///
/// Each wait starts when the previous request finishes, so a slow device
/// stretches the cadence. Dropping the poller stops the task as well.
pub(super) struct Poller {
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl Poller {
    pub(super) fn spawn(shared: Arc<Shared>, interval: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let runtime = shared.runtime.clone();

        let handle = runtime.spawn(async move {
            debug!(
                "[{}] Polling every {}ms",
                shared.name,
                interval.as_millis()
            );

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = tokio::time::sleep(interval) => {}
                }

                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = shared.get_switch_state() => {}
                }
            }

            debug!("[{}] Poll loop stopped", shared.name);
        });

        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Stop the loop and wait for it to exit. An in-flight poll is abandoned.
    pub(super) async fn stop(self) {
        // Err means the loop already exited
        let _ = self.shutdown_tx.send(());

        match self.handle.await {
            Ok(()) => info!("Poll loop stopped"),
            Err(e) if e.is_cancelled() => info!("Poll loop task cancelled"),
            Err(e) => warn!("Poll loop task error: {}", e),
        }
    }
}
