//! Fans out `lobby:update` notifications to every lobby-subscribed connection.

use std::sync::Arc;

use crate::protocol::{LobbyAction, RaceId, RaceStatus, ServerMessage};

use super::connection_manager::{ConnectionId, Outbound};
use super::RaceCoordinator;

#[derive(Debug, Default)]
pub struct LobbyBroadcaster;

impl LobbyBroadcaster {
    pub fn new() -> Self {
        Self
    }

    /// Publishes one `lobby:update` to every subscriber. A subscriber whose
    /// send channel is full or closed is silently dropped, per the lobby
    /// broadcaster's failure contract.
    pub async fn publish(
        &self,
        coordinator: &RaceCoordinator,
        action: LobbyAction,
        race_id: RaceId,
        participant_count: Option<usize>,
        status: Option<RaceStatus>,
    ) {
        let message = Arc::new(ServerMessage::LobbyUpdate {
            race_id,
            action,
            participant_count,
            status,
        });
        for conn in coordinator.connections.lobby_subscribers() {
            if let Some(sender) = coordinator.connections.sender(conn) {
                if sender.try_send(Outbound::Message(Arc::clone(&message))).is_err() {
                    tracing::debug!(%conn, race_id = %race_id, "dropped lobby update to a full or closed connection");
                }
            }
        }
    }
}

impl RaceCoordinator {
    pub(super) fn handle_lobby_subscribe(&self, conn: ConnectionId) {
        self.connections.set_lobby_subscribed(conn, true);
        self.metrics.record_lobby_subscriber_count(self.connections.lobby_subscribers().len());
    }

    pub(super) fn handle_lobby_unsubscribe(&self, conn: ConnectionId) {
        self.connections.set_lobby_subscribed(conn, false);
    }
}
