//! Server orchestration: the `RaceCoordinator` owns every piece of shared
//! state (rooms, connections, lobby subscribers, the matchmaking queue) and
//! is handed to every connection task behind an `Arc`.

use std::sync::Arc;

use crate::config::Config;
use crate::metrics::ServerMetrics;
use crate::persistence::PersistencePort;
use crate::protocol::ServerMessage;

mod connection_manager;
mod countdown;
mod heartbeat;
mod lobby_service;
mod matchmaking_service;
mod message_router;
mod registry;
mod room;
mod room_service;

pub use connection_manager::{ConnectionId, ConnectionManager, ConnectionState, Outbound};
pub use lobby_service::LobbyBroadcaster;
pub use matchmaking_service::MatchmakingQueue;
pub use registry::RoomRegistry;

/// Shared state behind every connection task.
pub struct RaceCoordinator {
    pub(crate) config: Config,
    pub(crate) registry: RoomRegistry,
    pub(crate) connections: ConnectionManager,
    pub(crate) lobby: LobbyBroadcaster,
    pub(crate) matchmaking: MatchmakingQueue,
    pub(crate) persistence: Arc<dyn PersistencePort>,
    pub(crate) metrics: Arc<ServerMetrics>,
}

impl RaceCoordinator {
    pub fn new(config: Config, persistence: Arc<dyn PersistencePort>, metrics: Arc<ServerMetrics>) -> Arc<Self> {
        Arc::new(Self {
            config,
            registry: RoomRegistry::new(),
            connections: ConnectionManager::new(),
            lobby: LobbyBroadcaster::new(),
            matchmaking: MatchmakingQueue::new(),
            persistence,
            metrics,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    pub fn metrics(&self) -> &Arc<ServerMetrics> {
        &self.metrics
    }

    pub(crate) async fn send_error(self: &Arc<Self>, conn: ConnectionId, message: impl Into<String>) {
        self.send(conn, ServerMessage::error(message)).await;
    }

    /// Cleans up every piece of state a connection held once its socket
    /// closes, dispatching to room and/or matchmaking cleanup as needed.
    pub async fn handle_disconnect(self: &Arc<Self>, conn: ConnectionId) {
        let Some(state) = self.connections.remove(conn) else {
            return;
        };
        self.metrics.decrement_active_connections();

        if state.in_matchmaking {
            self.handle_matchmaking_disconnect(conn).await;
        }

        if let Some(race_id) = state.race_id {
            self.handle_room_disconnect(conn, race_id, state.user_id, state.role).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::InMemoryPersistence;

    fn coordinator() -> Arc<RaceCoordinator> {
        RaceCoordinator::new(Config::default(), Arc::new(InMemoryPersistence::new()), Arc::new(ServerMetrics::new()))
    }

    #[tokio::test]
    async fn disconnect_of_a_bare_connection_is_a_no_op() {
        let coordinator = coordinator();
        let (tx, _rx) = tokio::sync::mpsc::channel(1);
        let conn = coordinator.connections.register(tx);
        coordinator.handle_disconnect(conn).await;
        assert_eq!(coordinator.connections.active_count(), 0);
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let coordinator = coordinator();
        let (tx, _rx) = tokio::sync::mpsc::channel(1);
        let conn = coordinator.connections.register(tx);
        coordinator.handle_disconnect(conn).await;
        // Second call: the connection is already gone, `remove` returns None.
        coordinator.handle_disconnect(conn).await;
    }
}
