//! WebSocket transport for the hub (axum).
//!
//! One task reads inbound frames and hands them to the hub; a second task
//! (`pump_outbox`) writes the connection's outbox to the socket. Whichever
//! ends first ends the connection.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::HubError;
use crate::ports::ConnectionSink;
use crate::service::{pump_outbox, BroadcastHub, Registration};

/// Write half of an axum WebSocket.
pub struct WebSocketSink(SplitSink<WebSocket, Message>);

#[async_trait]
impl ConnectionSink for WebSocketSink {
    async fn send(&mut self, frame: &str) -> Result<(), HubError> {
        self.0
            .send(Message::Text(frame.to_owned()))
            .await
            .map_err(|e| HubError::Transport(e.to_string()))
    }

    async fn close(&mut self) {
        if let Err(e) = self.0.close().await {
            debug!(error = %e, "WebSocket close failed");
        }
    }
}

/// Accept an upgrade request and attach the socket to `hub`.
pub fn upgrade(ws: WebSocketUpgrade, hub: Arc<BroadcastHub>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(hub, socket))
}

/// Serve one live subscriber until either side goes away.
pub async fn handle_socket(hub: Arc<BroadcastHub>, socket: WebSocket) {
    let (sink, mut stream) = socket.split();
    let Registration { id, outbox } = hub.register();
    let send_timeout = hub.config().send_timeout;

    let mut writer = tokio::spawn(pump_outbox(id, outbox, WebSocketSink(sink), send_timeout));

    loop {
        tokio::select! {
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => hub.handle_inbound(id, &text),
                Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                    Ok(text) => hub.handle_inbound(id, text),
                    Err(_) => debug!(connection_id = %id, "Ignoring non-UTF-8 binary frame"),
                },
                // Control frames are answered by the transport.
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    warn!(connection_id = %id, error = %e, "WebSocket receive error");
                    break;
                }
            },
            exit = &mut writer => {
                debug!(connection_id = %id, exit = ?exit, "WebSocket writer finished");
                hub.unregister(id);
                info!(connection_id = %id, "Live connection closed");
                return;
            }
        }
    }

    // Dropping the outbox sender lets the writer flush and close the socket.
    hub.unregister(id);
    if let Err(e) = writer.await {
        warn!(connection_id = %id, error = %e, "WebSocket writer task failed");
    }
    info!(connection_id = %id, "Live connection closed");
}
