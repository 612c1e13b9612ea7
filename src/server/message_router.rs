//! Top-level client message dispatcher: one handler call per message variant,
//! no state of its own.

use std::sync::Arc;

use crate::protocol::ClientMessage;

use super::connection_manager::ConnectionId;
use super::RaceCoordinator;

impl RaceCoordinator {
    pub async fn handle_client_message(self: &Arc<Self>, conn: ConnectionId, message: ClientMessage) {
        match message {
            ClientMessage::RaceJoin {
                race_id,
                user_id,
                user_name,
            } => {
                self.handle_race_join(conn, race_id, user_id, user_name).await;
            }
            ClientMessage::RaceLeave { race_id, user_id } => {
                self.handle_race_leave(conn, race_id, user_id).await;
            }
            ClientMessage::RaceStart { race_id } => {
                self.handle_race_start(conn, race_id).await;
            }
            ClientMessage::RaceProgress {
                race_id,
                user_id,
                progress,
                current_wpm,
            } => {
                self.handle_race_progress(race_id, user_id, progress, current_wpm).await;
            }
            ClientMessage::RaceFinish {
                race_id,
                user_id,
                wpm,
                accuracy,
            } => {
                self.handle_race_finish(race_id, user_id, wpm, accuracy).await;
            }
            ClientMessage::RaceAdvanceChallenge { race_id, user_id, .. } => {
                self.handle_race_advance_challenge(race_id, user_id).await;
            }
            ClientMessage::RaceCountdown { race_id, count } => {
                self.handle_race_countdown_relay(race_id, count).await;
            }
            ClientMessage::RaceSpectate { race_id } => {
                self.handle_race_spectate(conn, race_id).await;
            }
            ClientMessage::RaceUnspectate { race_id } => {
                self.handle_race_unspectate(conn, race_id).await;
            }
            ClientMessage::LobbySubscribe => {
                self.handle_lobby_subscribe(conn);
            }
            ClientMessage::LobbyUnsubscribe => {
                self.handle_lobby_unsubscribe(conn);
            }
            ClientMessage::MatchmakingJoin { user_id, user_name } => {
                self.handle_matchmaking_join(conn, user_id, user_name).await;
            }
            ClientMessage::MatchmakingLeave { user_id } => {
                self.handle_matchmaking_leave(conn, user_id).await;
            }
        }
    }
}
