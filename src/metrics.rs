//! Atomic counters exposed over `/metrics` as a JSON snapshot.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the coordinator's lifecycle events. Every field is a plain
/// `AtomicU64` updated with `Relaxed` ordering — these are independent
/// tallies, not synchronization primitives, matching how the rest of the
/// server treats its metrics.
#[derive(Debug)]
pub struct ServerMetrics {
    pub total_connections: AtomicU64,
    pub active_connections: AtomicU64,
    pub disconnections: AtomicU64,

    pub rooms_created: AtomicU64,
    pub rooms_removed: AtomicU64,
    pub races_started: AtomicU64,
    pub races_finished: AtomicU64,

    pub lobby_subscribers_peak: AtomicU64,
    pub matchmaking_joins: AtomicU64,
    pub matchmaking_matches_formed: AtomicU64,

    pub heartbeat_pings_sent: AtomicU64,
    pub heartbeat_expirations: AtomicU64,

    pub dropped_sends: AtomicU64,
    pub internal_errors: AtomicU64,
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self {
            total_connections: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            disconnections: AtomicU64::new(0),
            rooms_created: AtomicU64::new(0),
            rooms_removed: AtomicU64::new(0),
            races_started: AtomicU64::new(0),
            races_finished: AtomicU64::new(0),
            lobby_subscribers_peak: AtomicU64::new(0),
            matchmaking_joins: AtomicU64::new(0),
            matchmaking_matches_formed: AtomicU64::new(0),
            heartbeat_pings_sent: AtomicU64::new(0),
            heartbeat_expirations: AtomicU64::new(0),
            dropped_sends: AtomicU64::new(0),
            internal_errors: AtomicU64::new(0),
        }
    }

    pub fn increment_connections(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement_active_connections(&self) {
        let _ = self
            .active_connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                current.checked_sub(1)
            });
        self.disconnections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rooms_created(&self) {
        self.rooms_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rooms_removed(&self) {
        self.rooms_removed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_races_started(&self) {
        self.races_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_races_finished(&self) {
        self.races_finished.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lobby_subscriber_count(&self, count: usize) {
        let count = count as u64;
        let _ = self
            .lobby_subscribers_peak
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                if count > current {
                    Some(count)
                } else {
                    None
                }
            });
    }

    pub fn increment_matchmaking_joins(&self) {
        self.matchmaking_joins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_matchmaking_matches_formed(&self) {
        self.matchmaking_matches_formed
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_heartbeat_pings_sent(&self) {
        self.heartbeat_pings_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_heartbeat_expirations(&self) {
        self.heartbeat_expirations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_dropped_sends(&self) {
        self.dropped_sends.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_internal_errors(&self) {
        self.internal_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: chrono::Utc::now(),
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            disconnections: self.disconnections.load(Ordering::Relaxed),
            rooms_created: self.rooms_created.load(Ordering::Relaxed),
            rooms_removed: self.rooms_removed.load(Ordering::Relaxed),
            races_started: self.races_started.load(Ordering::Relaxed),
            races_finished: self.races_finished.load(Ordering::Relaxed),
            lobby_subscribers_peak: self.lobby_subscribers_peak.load(Ordering::Relaxed),
            matchmaking_joins: self.matchmaking_joins.load(Ordering::Relaxed),
            matchmaking_matches_formed: self.matchmaking_matches_formed.load(Ordering::Relaxed),
            heartbeat_pings_sent: self.heartbeat_pings_sent.load(Ordering::Relaxed),
            heartbeat_expirations: self.heartbeat_expirations.load(Ordering::Relaxed),
            dropped_sends: self.dropped_sends.load(Ordering::Relaxed),
            internal_errors: self.internal_errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MetricsSnapshot {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub total_connections: u64,
    pub active_connections: u64,
    pub disconnections: u64,
    pub rooms_created: u64,
    pub rooms_removed: u64,
    pub races_started: u64,
    pub races_finished: u64,
    pub lobby_subscribers_peak: u64,
    pub matchmaking_joins: u64,
    pub matchmaking_matches_formed: u64,
    pub heartbeat_pings_sent: u64,
    pub heartbeat_expirations: u64,
    pub dropped_sends: u64,
    pub internal_errors: u64,
}
