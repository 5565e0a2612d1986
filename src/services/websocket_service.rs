use axum::extract::ws::{Message, WebSocket};
use futures::{Sink, SinkExt, StreamExt};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info, warn};

use crate::{dto::ws::OutboundMessage, services::session_service, state::SharedState};

/// Handle the full lifecycle of one participant WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (sender, mut receiver) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<OutboundMessage>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(write_frames(sender, outbound_rx));

    // The registry owns the only sender from here on; the writer stops once
    // the participant is unregistered.
    let id = session_service::connect(&state, outbound_tx).await;
    info!(participant = id, "participant connected");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                debug!(participant = id, payload = %text, "received participant message");
                session_service::handle_text(&state, id, text.as_str()).await;
            }
            Ok(Message::Close(_)) => {
                info!(participant = id, "participant closed the connection");
                break;
            }
            Ok(Message::Binary(_)) => {
                debug!(participant = id, "ignoring binary frame");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(participant = id, error = %err, "websocket error");
                break;
            }
        }
    }

    session_service::disconnect(&state, id).await;
    info!(participant = id, "participant disconnected");

    if let Err(err) = writer_task.await {
        warn!(participant = id, error = %err, "websocket writer task failed");
    }
}

/// Encode queued messages into text frames until the outbox closes or the socket goes away.
async fn write_frames<S>(mut sink: S, mut outbound: UnboundedReceiver<OutboundMessage>)
where
    S: Sink<Message> + Unpin,
{
    while let Some(message) = outbound.recv().await {
        let payload = match message.encode() {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "failed to serialize message `{message:?}` (permanent error, not retrying)");
                continue;
            }
        };
        if sink.send(Message::Text(payload.into())).await.is_err() {
            break;
        }
    }
}
