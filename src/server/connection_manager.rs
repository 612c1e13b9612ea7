//! Tracks live WebSocket connections and their binding to a race room.
//!
//! Connection identity here is process-local (`ConnectionId`, an `AtomicU64`
//! counter) rather than a globally unique identifier — nothing in this
//! protocol needs one to survive outside the current process.
//! Stable cross-reconnect identity is the client-supplied `UserId`, tracked
//! separately once a connection joins a race or the matchmaking queue.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::protocol::{ConnectionRole, RaceId, ServerMessage, UserId};

/// A frame destined for a connection's send task.
#[derive(Debug, Clone)]
pub enum Outbound {
    /// A JSON protocol message.
    Message(Arc<ServerMessage>),
    /// A transport-level ping; expects a pong within one heartbeat interval.
    Ping,
    /// Forcibly close the socket (used by the heartbeat sweep).
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Snapshot of a connection's bindings, returned by reads so callers don't
/// hold a `DashMap` shard lock while they decide what to do next.
#[derive(Debug, Clone, Default)]
pub struct ConnectionState {
    pub race_id: Option<RaceId>,
    pub user_id: Option<UserId>,
    pub user_name: Option<String>,
    pub role: ConnectionRole,
    pub subscribed_to_lobby: bool,
    pub in_matchmaking: bool,
}

struct Entry {
    sender: mpsc::Sender<Outbound>,
    alive: bool,
    state: ConnectionState,
}

/// Registry of every currently-connected socket.
pub struct ConnectionManager {
    connections: DashMap<ConnectionId, Entry>,
    next_id: AtomicU64,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn register(&self, sender: mpsc::Sender<Outbound>) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.connections.insert(
            id,
            Entry {
                sender,
                alive: true,
                state: ConnectionState::default(),
            },
        );
        id
    }

    pub fn remove(&self, id: ConnectionId) -> Option<ConnectionState> {
        self.connections.remove(&id).map(|(_, entry)| entry.state)
    }

    pub fn state(&self, id: ConnectionId) -> Option<ConnectionState> {
        self.connections.get(&id).map(|entry| entry.state.clone())
    }

    pub fn sender(&self, id: ConnectionId) -> Option<mpsc::Sender<Outbound>> {
        self.connections.get(&id).map(|entry| entry.sender.clone())
    }

    pub fn bind_race(
        &self,
        id: ConnectionId,
        race_id: RaceId,
        user_id: UserId,
        user_name: String,
        role: ConnectionRole,
    ) {
        if let Some(mut entry) = self.connections.get_mut(&id) {
            entry.state.race_id = Some(race_id);
            entry.state.user_id = Some(user_id);
            entry.state.user_name = Some(user_name);
            entry.state.role = role;
        }
    }

    /// Binds a connection as a spectator without touching `user_id` — the
    /// spectate message carries no user identity, unlike `race:join`.
    pub fn bind_spectator(&self, id: ConnectionId, race_id: RaceId) {
        if let Some(mut entry) = self.connections.get_mut(&id) {
            entry.state.race_id = Some(race_id);
            entry.state.role = ConnectionRole::Spectator;
        }
    }

    pub fn unbind_race(&self, id: ConnectionId) {
        if let Some(mut entry) = self.connections.get_mut(&id) {
            entry.state.race_id = None;
            entry.state.role = ConnectionRole::None;
        }
    }

    pub fn set_lobby_subscribed(&self, id: ConnectionId, subscribed: bool) {
        if let Some(mut entry) = self.connections.get_mut(&id) {
            entry.state.subscribed_to_lobby = subscribed;
        }
    }

    pub fn set_in_matchmaking(&self, id: ConnectionId, in_matchmaking: bool) {
        if let Some(mut entry) = self.connections.get_mut(&id) {
            entry.state.in_matchmaking = in_matchmaking;
        }
    }

    pub fn mark_alive(&self, id: ConnectionId) {
        if let Some(mut entry) = self.connections.get_mut(&id) {
            entry.alive = true;
        }
    }

    pub fn lobby_subscribers(&self) -> Vec<ConnectionId> {
        self.connections
            .iter()
            .filter(|entry| entry.state.subscribed_to_lobby)
            .map(|entry| *entry.key())
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.connections.len()
    }

    /// One heartbeat sweep over every connection.
    ///
    /// Connections whose liveness flag was already clear (no pong since the
    /// last sweep) are returned for forced termination. Every connection that
    /// survives has its flag cleared and is returned to be pinged; a pong
    /// response sets the flag again via [`ConnectionManager::mark_alive`].
    pub fn sweep(&self) -> (Vec<ConnectionId>, Vec<ConnectionId>) {
        let mut expired = Vec::new();
        let mut to_ping = Vec::new();
        for mut entry in self.connections.iter_mut() {
            if entry.alive {
                entry.alive = false;
                to_ping.push(*entry.key());
            } else {
                expired.push(*entry.key());
            }
        }
        (expired, to_ping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> (mpsc::Sender<Outbound>, mpsc::Receiver<Outbound>) {
        mpsc::channel(8)
    }

    #[test]
    fn register_assigns_distinct_ids() {
        let manager = ConnectionManager::new();
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();
        let a = manager.register(tx1);
        let b = manager.register(tx2);
        assert_ne!(a, b);
        assert_eq!(manager.active_count(), 2);
    }

    #[test]
    fn remove_returns_last_known_state() {
        let manager = ConnectionManager::new();
        let (tx, _rx) = channel();
        let id = manager.register(tx);
        manager.bind_race(
            id,
            RaceId(1),
            UserId(42),
            "Ada".to_string(),
            ConnectionRole::Racer,
        );
        let state = manager.remove(id).unwrap();
        assert_eq!(state.race_id, Some(RaceId(1)));
        assert_eq!(state.user_id, Some(UserId(42)));
        assert_eq!(manager.active_count(), 0);
    }

    #[test]
    fn sweep_pings_once_then_expires_silent_connections() {
        let manager = ConnectionManager::new();
        let (tx, _rx) = channel();
        let id = manager.register(tx);

        let (expired, to_ping) = manager.sweep();
        assert!(expired.is_empty());
        assert_eq!(to_ping, vec![id]);

        // No pong arrived before the next sweep.
        let (expired, to_ping) = manager.sweep();
        assert_eq!(expired, vec![id]);
        assert!(to_ping.is_empty());
    }

    #[test]
    fn pong_resets_liveness_before_next_sweep() {
        let manager = ConnectionManager::new();
        let (tx, _rx) = channel();
        let id = manager.register(tx);

        let _ = manager.sweep();
        manager.mark_alive(id);
        let (expired, to_ping) = manager.sweep();
        assert!(expired.is_empty());
        assert_eq!(to_ping, vec![id]);
    }

    #[test]
    fn lobby_subscribers_reflects_subscription_state() {
        let manager = ConnectionManager::new();
        let (tx, _rx) = channel();
        let id = manager.register(tx);
        assert!(manager.lobby_subscribers().is_empty());
        manager.set_lobby_subscribed(id, true);
        assert_eq!(manager.lobby_subscribers(), vec![id]);
        manager.set_lobby_subscribed(id, false);
        assert!(manager.lobby_subscribers().is_empty());
    }
}
