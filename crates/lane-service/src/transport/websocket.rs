//! WebSocket connection handling.
//!
//! Each accepted socket is split: a writer task drains the connection's
//! outbound queue into the sink, and the upgrade task itself reads frames
//! and forwards them to the gateway. When the reader ends (close frame,
//! transport error, or the gateway going away) the connection is
//! disconnected; the writer then ends once its queue is dropped.

use super::routes::AppState;
use crate::actors::{ConnectionHandle, ConnectionId, ConnectionKind, GatewayHandle};
use crate::errors::LaneError;
use crate::observability::metrics;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use lane_protocol::{decode_raw_hit, decode_request, encode_event, frame_text, ServerEvent};
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// `GET /ws`
pub async fn client_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    let gateway = state.gateway.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, ConnectionKind::Client, gateway))
}

/// `GET /tracker`
pub async fn tracker_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let gateway = state.gateway.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, ConnectionKind::Tracker, gateway))
}

async fn handle_socket(socket: WebSocket, kind: ConnectionKind, gateway: GatewayHandle) {
    let (connection, outbound) = match gateway.connect(kind).await {
        Ok(registered) => registered,
        Err(e) => {
            warn!(target: "lane.ws", kind = kind.as_str(), error = %e, "Connection rejected");
            return;
        }
    };
    let connection_id = connection.id();
    debug!(
        target: "lane.ws",
        connection_id = %connection_id,
        kind = kind.as_str(),
        "WebSocket connected"
    );

    let (sink, mut stream) = socket.split();
    let greeting = (kind == ConnectionKind::Client).then(ServerEvent::connected);
    tokio::spawn(write_loop(sink, outbound, greeting, connection_id));

    while let Some(frame) = stream.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                debug!(
                    target: "lane.ws",
                    connection_id = %connection_id,
                    error = %e,
                    "WebSocket read failed"
                );
                break;
            }
        };

        let text = match &frame {
            Message::Text(text) => text.as_str(),
            Message::Binary(bytes) => match frame_text(bytes) {
                Ok(text) => text,
                Err(e) => {
                    reject_frame(&connection, &e.to_string());
                    continue;
                }
            },
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => continue,
        };

        let flow = match kind {
            ConnectionKind::Client => on_client_frame(&gateway, &connection, text).await,
            ConnectionKind::Tracker => on_tracker_frame(&gateway, &connection, text).await,
        };
        if flow.is_break() {
            break;
        }
    }

    debug!(target: "lane.ws", connection_id = %connection_id, "WebSocket closed");
    if let Err(e) = gateway.disconnect(connection_id).await {
        debug!(
            target: "lane.ws",
            connection_id = %connection_id,
            error = %e,
            "Disconnect not delivered"
        );
    }
}

async fn on_client_frame(
    gateway: &GatewayHandle,
    connection: &ConnectionHandle,
    text: &str,
) -> ControlFlow<()> {
    let request = match decode_request(text) {
        Ok(request) => request,
        Err(e) => {
            reject_frame(connection, &e.to_string());
            return ControlFlow::Continue(());
        }
    };

    // Request-level failures were already answered on this socket.
    if let Err(e) = gateway.request(connection.id(), request).await {
        if gateway.is_cancelled() {
            warn!(
                target: "lane.ws",
                connection_id = %connection.id(),
                error = %e,
                "Gateway unavailable, closing connection"
            );
            return ControlFlow::Break(());
        }
    }
    ControlFlow::Continue(())
}

async fn on_tracker_frame(
    gateway: &GatewayHandle,
    connection: &ConnectionHandle,
    text: &str,
) -> ControlFlow<()> {
    let hit = match decode_raw_hit(text) {
        Ok(hit) => hit,
        Err(e) => {
            warn!(
                target: "lane.relay",
                tracker_id = %connection.id(),
                error = %e,
                "Malformed tracker event dropped"
            );
            metrics::record_tracker_event_dropped();
            return ControlFlow::Continue(());
        }
    };

    match gateway.relay_hit(connection.id(), hit).await {
        Ok(()) => ControlFlow::Continue(()),
        Err(e) => {
            warn!(
                target: "lane.relay",
                tracker_id = %connection.id(),
                error = %e,
                "Gateway unavailable, closing tracker"
            );
            ControlFlow::Break(())
        }
    }
}

/// Answer an unparseable client frame. Trackers get nothing back.
fn reject_frame(connection: &ConnectionHandle, reason: &str) {
    if connection.kind() == ConnectionKind::Tracker {
        warn!(
            target: "lane.relay",
            tracker_id = %connection.id(),
            reason,
            "Malformed tracker event dropped"
        );
        metrics::record_tracker_event_dropped();
        return;
    }

    let error = LaneError::MalformedEvent(reason.to_string());
    debug!(
        target: "lane.ws",
        connection_id = %connection.id(),
        error = %error,
        "Unparseable frame"
    );
    let _ = connection.try_deliver(ServerEvent::Error {
        code: error.error_code(),
        message: error.client_message(),
    });
}

async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<ServerEvent>,
    greeting: Option<ServerEvent>,
    connection_id: ConnectionId,
) {
    if let Some(greeting) = greeting {
        if write_event(&mut sink, &greeting).await.is_break() {
            return;
        }
    }

    while let Some(event) = outbound.recv().await {
        if write_event(&mut sink, &event).await.is_break() {
            break;
        }
    }

    let _ = sink.close().await;
    debug!(target: "lane.ws", connection_id = %connection_id, "Writer task ended");
}

async fn write_event(
    sink: &mut SplitSink<WebSocket, Message>,
    event: &ServerEvent,
) -> ControlFlow<()> {
    let text = match encode_event(event) {
        Ok(text) => text,
        Err(e) => {
            warn!(target: "lane.ws", event = event.name(), error = %e, "Event encoding failed");
            return ControlFlow::Continue(());
        }
    };
    if sink.send(Message::Text(text)).await.is_err() {
        return ControlFlow::Break(());
    }
    ControlFlow::Continue(())
}
