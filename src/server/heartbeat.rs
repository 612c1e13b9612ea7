//! Periodic liveness sweep over every connection.
//!
//! Every tick: connections that didn't pong since the last sweep are
//! forcibly closed (full disconnect handling runs); everyone else gets a
//! fresh ping and their liveness flag is cleared until the next pong.

use std::sync::Arc;
use std::time::Duration;

use super::connection_manager::Outbound;
use super::RaceCoordinator;

impl RaceCoordinator {
    pub fn spawn_heartbeat(self: &Arc<Self>) {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            let interval = Duration::from_secs(coordinator.config.server.heartbeat_interval_secs);
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                coordinator.run_heartbeat_sweep().await;
            }
        });
    }

    async fn run_heartbeat_sweep(self: &Arc<Self>) {
        let (expired, to_ping) = self.connections.sweep();

        for conn in to_ping {
            if let Some(sender) = self.connections.sender(conn) {
                if sender.try_send(Outbound::Ping).is_err() {
                    tracing::debug!(%conn, "failed to queue heartbeat ping");
                } else {
                    self.metrics.increment_heartbeat_pings_sent();
                }
            }
        }

        for conn in expired {
            self.metrics.increment_heartbeat_expirations();
            if let Some(sender) = self.connections.sender(conn) {
                let _ = sender.try_send(Outbound::Close);
            }
            self.handle_disconnect(conn).await;
        }
    }
}
