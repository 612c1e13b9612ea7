use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::Response;

use crate::server::RaceCoordinator;

use super::connection::handle_socket;

/// WebSocket upgrade entry point: negotiates nothing beyond the protocol
/// upgrade itself and hands the socket to the per-connection task.
pub async fn websocket_handler(ws: WebSocketUpgrade, State(coordinator): State<Arc<RaceCoordinator>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, coordinator))
}
