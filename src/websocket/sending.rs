use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;

use crate::server::Outbound;

/// Writes one queued frame to the socket. JSON messages are the common case;
/// `Ping`/`Close` are transport-level and carry no payload of their own.
pub(super) async fn send_outbound(
    sender: &mut SplitSink<WebSocket, Message>,
    outbound: Outbound,
) -> Result<(), axum::Error> {
    match outbound {
        Outbound::Message(message) => {
            let payload = match serde_json::to_string(message.as_ref()) {
                Ok(payload) => payload,
                Err(err) => {
                    tracing::error!(error = %err, "failed to serialize outbound message");
                    return Ok(());
                }
            };
            sender.send(Message::Text(payload.into())).await
        }
        Outbound::Ping => sender.send(Message::Ping(Vec::new().into())).await,
        Outbound::Close => sender.send(Message::Close(None)).await,
    }
}
