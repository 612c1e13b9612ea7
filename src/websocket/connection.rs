use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::protocol::parse_client_message;
use crate::server::{ConnectionId, Outbound, RaceCoordinator};

use super::sending::send_outbound;

const SEND_QUEUE_CAPACITY: usize = 32;

pub(super) async fn handle_socket(socket: WebSocket, coordinator: Arc<RaceCoordinator>) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Outbound>(SEND_QUEUE_CAPACITY);

    let conn = coordinator.connections().register(tx);
    coordinator.metrics().increment_connections();
    tracing::info!(%conn, "connection established");

    let send_task = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let should_close = matches!(outbound, Outbound::Close);
            if send_outbound(&mut sender, outbound).await.is_err() || should_close {
                break;
            }
        }
        let _ = sender.close().await;
    });

    let coordinator_for_receive = Arc::clone(&coordinator);
    let receive_task = tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            let message = match frame {
                Ok(message) => message,
                Err(err) => {
                    tracing::debug!(%conn, error = %err, "websocket error, closing connection");
                    break;
                }
            };

            match message {
                Message::Text(text) => match parse_client_message(&text) {
                    Ok(client_message) => {
                        coordinator_for_receive.handle_client_message(conn, client_message).await;
                    }
                    Err(err) => {
                        coordinator_for_receive.send_error(conn, err.message()).await;
                    }
                },
                Message::Pong(_) => {
                    coordinator_for_receive.connections().mark_alive(conn);
                }
                Message::Close(_) => {
                    tracing::info!(%conn, "connection closed by peer");
                    break;
                }
                Message::Binary(_) | Message::Ping(_) => {
                    // The protocol is JSON-text-only; transport pings are answered
                    // automatically by axum, and stray binary frames are ignored.
                }
            }
        }
    });

    tokio::select! {
        _ = send_task => {}
        _ = receive_task => {}
    }

    coordinator.handle_disconnect(conn).await;
    tracing::info!(%conn, "connection cleaned up");
}
