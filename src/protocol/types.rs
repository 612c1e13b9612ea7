//! Core identifiers and value types shared across the protocol and coordinator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a race room. The wire protocol types this as a JSON integer,
/// not a UUID, so it is a thin newtype over `i64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RaceId(pub i64);

impl fmt::Display for RaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identity of a user, trusted from `race:join` / `matchmaking:join`
/// payloads but never used to bypass membership checks elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque category identifier returned by the match factory port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub i64);

/// Role a connection currently holds within its bound room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionRole {
    #[default]
    None,
    Racer,
    Spectator,
}

/// Lifecycle state of a race room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceStatus {
    Waiting,
    Countdown,
    InProgress,
    Finished,
}

/// Action carried by a `lobby:update` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LobbyAction {
    Created,
    Updated,
    Removed,
}

/// Status carried by a `matchmaking:status` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchmakingStatus {
    Queued,
    Matched,
    Cancelled,
}
