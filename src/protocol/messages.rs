//! Wire protocol: tagged client/server message unions.
//!
//! Every frame is one JSON object with a `type` discriminator and its fields
//! flattened at the top level (no nested `data`/`content` wrapper), matching
//! the shapes listed in the external interface and end-to-end scenarios.

use super::types::{LobbyAction, MatchmakingStatus, RaceId, RaceStatus, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Inbound frame, decoded at the connection boundary.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    #[serde(rename = "race:join")]
    RaceJoin {
        race_id: RaceId,
        user_id: UserId,
        user_name: String,
    },
    #[serde(rename = "race:leave")]
    RaceLeave { race_id: RaceId, user_id: UserId },
    #[serde(rename = "race:start")]
    RaceStart { race_id: RaceId },
    #[serde(rename = "race:progress")]
    RaceProgress {
        race_id: RaceId,
        user_id: UserId,
        progress: f64,
        current_wpm: f64,
    },
    #[serde(rename = "race:finish")]
    RaceFinish {
        race_id: RaceId,
        user_id: UserId,
        wpm: f64,
        accuracy: f64,
    },
    #[serde(rename = "race:advanceChallenge")]
    RaceAdvanceChallenge {
        race_id: RaceId,
        user_id: UserId,
        /// Reserved: not consumed by the coordinator or the persistence port.
        #[serde(default)]
        challenge_wpm: Option<f64>,
        #[serde(default)]
        challenge_accuracy: Option<f64>,
    },
    /// Relay-only: broadcasts a countdown snapshot verbatim, for clients that
    /// drive their own countdown rather than relying on `race:start`.
    #[serde(rename = "race:countdown")]
    RaceCountdown { race_id: RaceId, count: i32 },
    #[serde(rename = "race:spectate")]
    RaceSpectate { race_id: RaceId },
    #[serde(rename = "race:unspectate")]
    RaceUnspectate { race_id: RaceId },
    #[serde(rename = "lobby:subscribe")]
    LobbySubscribe,
    #[serde(rename = "lobby:unsubscribe")]
    LobbyUnsubscribe,
    #[serde(rename = "matchmaking:join")]
    MatchmakingJoin { user_id: UserId, user_name: String },
    #[serde(rename = "matchmaking:leave")]
    MatchmakingLeave { user_id: UserId },
}

/// A single participant as seen in a `race:state` snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSnapshot {
    pub user_id: UserId,
    pub user_name: String,
    pub current_challenge_index: u32,
    pub progress: f64,
    pub current_wpm: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wpm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
}

/// A player carried in a `matchmaking:status{status:"matched"}` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedPlayer {
    pub user_id: UserId,
    pub user_name: String,
}

/// Outbound frame, serialized to the connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    #[serde(rename = "race:state")]
    RaceState {
        race_id: RaceId,
        status: RaceStatus,
        participants: Vec<ParticipantSnapshot>,
        #[serde(skip_serializing_if = "Option::is_none")]
        countdown_value: Option<i32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        start_time: Option<DateTime<Utc>>,
        spectator_count: usize,
    },
    #[serde(rename = "lobby:update")]
    LobbyUpdate {
        race_id: RaceId,
        action: LobbyAction,
        #[serde(skip_serializing_if = "Option::is_none")]
        participant_count: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<RaceStatus>,
    },
    #[serde(rename = "matchmaking:status")]
    MatchmakingStatusMsg {
        status: MatchmakingStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        average_wpm: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        queue_size: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        race_id: Option<RaceId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        players: Option<Vec<MatchedPlayer>>,
    },
    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// Why an inbound frame failed to decode into a [`ClientMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMessageError {
    /// Not valid JSON, or JSON with no recognizable `type` string.
    InvalidFormat,
    /// Valid JSON carrying a `type` the server doesn't know.
    UnknownType,
}

impl ClientMessageError {
    pub fn message(self) -> &'static str {
        match self {
            Self::InvalidFormat => "Invalid message format",
            Self::UnknownType => "Unknown message type",
        }
    }
}

/// The `type` tags `ClientMessage` recognizes, kept in lockstep with its
/// `#[serde(rename = ...)]` attributes so unknown-type detection doesn't rely
/// on parsing serde's error text.
const KNOWN_CLIENT_MESSAGE_TYPES: &[&str] = &[
    "race:join",
    "race:leave",
    "race:start",
    "race:progress",
    "race:finish",
    "race:advanceChallenge",
    "race:countdown",
    "race:spectate",
    "race:unspectate",
    "lobby:subscribe",
    "lobby:unsubscribe",
    "matchmaking:join",
    "matchmaking:leave",
];

/// Decodes one inbound frame, distinguishing malformed JSON from a
/// well-formed frame carrying an unrecognized `type`.
pub fn parse_client_message(text: &str) -> Result<ClientMessage, ClientMessageError> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(|_| ClientMessageError::InvalidFormat)?;
    let type_tag = value.get("type").and_then(|t| t.as_str()).ok_or(ClientMessageError::InvalidFormat)?;
    if !KNOWN_CLIENT_MESSAGE_TYPES.contains(&type_tag) {
        return Err(ClientMessageError::UnknownType);
    }
    serde_json::from_value(value).map_err(|_| ClientMessageError::InvalidFormat)
}
