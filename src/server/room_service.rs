//! Handlers for `race:*` client messages: each mutates the target room under
//! its lock and fans the resulting snapshot out before releasing it, so the
//! room-serialization and broadcast-ordering contracts hold by construction.

use std::sync::Arc;

use chrono::Utc;

use crate::protocol::{validate_user_name_with_config, ConnectionRole, LobbyAction, RaceId, RaceStatus, ServerMessage, UserId};

use super::connection_manager::{ConnectionId, ConnectionManager, Outbound};
use super::countdown;
use super::room::RaceRoom;
use super::RaceCoordinator;

pub(super) fn build_snapshot(room: &RaceRoom, countdown_value: Option<i32>) -> ServerMessage {
    ServerMessage::RaceState {
        race_id: room.race_id(),
        status: room.status(),
        participants: room.snapshot_participants(),
        countdown_value,
        start_time: room.countdown_deadline(),
        spectator_count: room.spectator_count(),
    }
}

/// Sends the room's current snapshot to every racer and spectator connection.
/// Uses `try_send` so a slow or closed peer never blocks the room's progress.
pub(super) fn broadcast(connections: &ConnectionManager, room: &RaceRoom, countdown_value: Option<i32>) {
    let message = Arc::new(build_snapshot(room, countdown_value));
    for conn in room.all_connections() {
        if let Some(sender) = connections.sender(conn) {
            if sender.try_send(Outbound::Message(Arc::clone(&message))).is_err() {
                tracing::debug!(%conn, race_id = %room.race_id(), "dropped snapshot to a full or closed connection");
            }
        }
    }
}

impl RaceCoordinator {
    pub async fn handle_race_join(
        self: &Arc<Self>,
        conn: ConnectionId,
        race_id: RaceId,
        user_id: UserId,
        user_name: String,
    ) {
        if let Err(reason) = validate_user_name_with_config(&user_name, &self.config.protocol) {
            self.send_error(conn, reason).await;
            return;
        }

        let (room_lock, created) = self.registry.get_or_create(race_id);
        if created {
            self.metrics.increment_rooms_created();
        }
        let (participant_count, status) = {
            let mut room = room_lock.lock().await;
            room.join(conn, user_id, user_name.clone());
            self.connections
                .bind_race(conn, race_id, user_id, user_name, ConnectionRole::Racer);
            broadcast(&self.connections, &room, None);
            (room.participant_count(), room.status())
        };
        self.lobby
            .publish(self, LobbyAction::Updated, race_id, Some(participant_count), Some(status))
            .await;
    }

    pub async fn handle_race_leave(self: &Arc<Self>, conn: ConnectionId, race_id: RaceId, user_id: UserId) {
        let Some(room_lock) = self.registry.get(race_id) else {
            return;
        };
        let outcome = {
            let mut room = room_lock.lock().await;
            let became_empty = room.leave(conn, user_id);
            if became_empty {
                None
            } else {
                broadcast(&self.connections, &room, None);
                Some((room.participant_count(), room.status()))
            }
        };
        self.connections.unbind_race(conn);
        match outcome {
            None => {
                self.registry.remove(race_id);
                self.metrics.increment_rooms_removed();
                self.lobby
                    .publish(self, LobbyAction::Removed, race_id, None, None)
                    .await;
            }
            Some((count, status)) => {
                self.lobby
                    .publish(self, LobbyAction::Updated, race_id, Some(count), Some(status))
                    .await;
            }
        }
    }

    pub async fn handle_race_start(self: &Arc<Self>, conn: ConnectionId, race_id: RaceId) {
        let Some(room_lock) = self.registry.get(race_id) else {
            self.send_error(conn, "Race not found").await;
            return;
        };
        let countdown_seconds = self.config.server.countdown_seconds;
        let result = {
            let mut room = room_lock.lock().await;
            room.start(countdown_seconds, Utc::now())
        };
        match result {
            Ok(handle) => {
                self.metrics.increment_races_started();
                countdown::spawn(Arc::clone(self), race_id, handle, countdown_seconds);
            }
            Err(err) => self.send_error(conn, err.message()).await,
        }
    }

    pub async fn handle_race_progress(self: &Arc<Self>, race_id: RaceId, user_id: UserId, progress: f64, current_wpm: f64) {
        let Some(room_lock) = self.registry.get(race_id) else {
            return;
        };
        let mut room = room_lock.lock().await;
        if room.progress(user_id, progress, current_wpm) {
            broadcast(&self.connections, &room, None);
        }
    }

    pub async fn handle_race_finish(self: &Arc<Self>, race_id: RaceId, user_id: UserId, wpm: f64, accuracy: f64) {
        let Some(room_lock) = self.registry.get(race_id) else {
            return;
        };
        let all_finished = {
            let mut room = room_lock.lock().await;
            let Some(all_finished) = room.finish(user_id, wpm, accuracy, Utc::now()) else {
                return;
            };
            broadcast(&self.connections, &room, None);
            all_finished
        };
        if all_finished {
            self.metrics.increment_races_finished();
            self.lobby
                .publish(self, LobbyAction::Removed, race_id, None, None)
                .await;
        }
    }

    pub async fn handle_race_advance_challenge(self: &Arc<Self>, race_id: RaceId, user_id: UserId) {
        let Some(room_lock) = self.registry.get(race_id) else {
            return;
        };
        let mut room = room_lock.lock().await;
        if room.advance_challenge(user_id) {
            broadcast(&self.connections, &room, None);
        }
    }

    /// `race:countdown` — relay-only, for client-driven countdowns.
    pub async fn handle_race_countdown_relay(self: &Arc<Self>, race_id: RaceId, count: i32) {
        let Some(room_lock) = self.registry.get(race_id) else {
            return;
        };
        let room = room_lock.lock().await;
        broadcast(&self.connections, &room, Some(count));
    }

    pub async fn handle_race_spectate(self: &Arc<Self>, conn: ConnectionId, race_id: RaceId) {
        let Some(room_lock) = self.registry.get(race_id) else {
            self.send_error(conn, "Race not found").await;
            return;
        };
        let racing_user_id = self.connections.state(conn).and_then(|state| {
            (state.race_id == Some(race_id) && state.role == ConnectionRole::Racer).then_some(state.user_id).flatten()
        });
        let mut room = room_lock.lock().await;
        room.spectate(conn, racing_user_id);
        self.connections.bind_spectator(conn, race_id);
        broadcast(&self.connections, &room, None);
    }

    pub async fn handle_race_unspectate(self: &Arc<Self>, conn: ConnectionId, race_id: RaceId) {
        let Some(room_lock) = self.registry.get(race_id) else {
            return;
        };
        let mut room = room_lock.lock().await;
        room.unspectate(conn);
        self.connections.unbind_race(conn);
        broadcast(&self.connections, &room, None);
    }

    /// Disconnect cleanup for a connection that was bound to a race room.
    pub(super) async fn handle_room_disconnect(
        self: &Arc<Self>,
        conn: ConnectionId,
        race_id: RaceId,
        user_id: Option<UserId>,
        role: ConnectionRole,
    ) {
        let Some(room_lock) = self.registry.get(race_id) else {
            return;
        };

        match role {
            ConnectionRole::Spectator => {
                let mut room = room_lock.lock().await;
                room.disconnect_spectator(conn);
                broadcast(&self.connections, &room, None);
            }
            ConnectionRole::Racer => {
                let Some(user_id) = user_id else {
                    return;
                };
                let outcome = {
                    let mut room = room_lock.lock().await;
                    if room.status() == RaceStatus::Waiting {
                        if room.leave(conn, user_id) {
                            None
                        } else {
                            broadcast(&self.connections, &room, None);
                            Some((room.participant_count(), room.status()))
                        }
                    } else {
                        room.disconnect_racer_in_flight(conn);
                        broadcast(&self.connections, &room, None);
                        Some((room.participant_count(), room.status()))
                    }
                };
                match outcome {
                    None => {
                        self.registry.remove(race_id);
                        self.metrics.increment_rooms_removed();
                        self.lobby
                            .publish(self, LobbyAction::Removed, race_id, None, None)
                            .await;
                    }
                    Some((count, status)) => {
                        self.lobby
                            .publish(self, LobbyAction::Updated, race_id, Some(count), Some(status))
                            .await;
                    }
                }
            }
            ConnectionRole::None => {}
        }
    }
}
