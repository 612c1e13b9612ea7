// Protocol module: wire message types and shared identifiers.

pub mod messages;
pub mod types;
pub mod validation;

pub use messages::{parse_client_message, ClientMessage, ClientMessageError, MatchedPlayer, ParticipantSnapshot, ServerMessage};
pub use types::{
    CategoryId, ConnectionRole, LobbyAction, MatchmakingStatus, RaceId, RaceStatus, UserId,
};
pub use validation::validate_user_name_with_config;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn race_id_round_trips_through_json() {
        let id = RaceId(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "42");
        let back: RaceId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn race_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&RaceStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(
            serde_json::to_string(&RaceStatus::Waiting).unwrap(),
            "\"waiting\""
        );
    }

    #[test]
    fn lobby_action_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&LobbyAction::Created).unwrap(),
            "\"created\""
        );
    }

    #[test]
    fn full_race_state_round_trips() {
        let msg = ServerMessage::RaceState {
            race_id: RaceId(7),
            status: RaceStatus::Countdown,
            participants: vec![ParticipantSnapshot {
                user_id: UserId(1),
                user_name: "Alice".to_string(),
                current_challenge_index: 0,
                progress: 0.0,
                current_wpm: 0.0,
                wpm: None,
                accuracy: None,
                finished_at: None,
                rank: None,
            }],
            countdown_value: Some(3),
            start_time: None,
            spectator_count: 0,
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: ServerMessage = serde_json::from_str(&json).unwrap();
        match back {
            ServerMessage::RaceState {
                race_id,
                countdown_value,
                ..
            } => {
                assert_eq!(race_id, RaceId(7));
                assert_eq!(countdown_value, Some(3));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
