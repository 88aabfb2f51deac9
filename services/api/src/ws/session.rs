//! Connection lifecycle for both WebSocket legs.
//!
//! `/stream` carries the phone call's media channel (transport leg) and
//! `/elevenlabs` the voice agent's conversation channel (agent leg). Both
//! must present `sessionId` and `agentId` as query parameters or the
//! connection is closed with a policy-violation code before any registry
//! entry is created.

use super::{control, protocol, relay::ConnectionSink, relay::WsSink};
use crate::state::AppState;
use axum::{
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::Response,
};
use futures_util::StreamExt;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Connection-time parameters, supplied as query parameters on the upgrade
/// request. `reservationId` is only meaningful on the transport leg.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    pub session_id: Option<String>,
    pub agent_id: Option<String>,
    pub reservation_id: Option<String>,
}

/// Axum handler for the transport leg (`/stream`).
pub async fn stream_ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_transport_socket(socket, state, params))
}

/// Axum handler for the agent leg (`/elevenlabs`).
pub async fn agent_ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_agent_socket(socket, state, params))
}

#[instrument(name = "transport_leg", skip_all, fields(session_id = tracing::field::Empty))]
async fn handle_transport_socket(socket: WebSocket, state: AppState, params: ConnectParams) {
    let (Some(session_id), Some(agent_id)) = (params.session_id, params.agent_id) else {
        warn!("Transport connection rejected: missing required parameters");
        reject(socket).await;
        return;
    };
    tracing::Span::current().record("session_id", session_id.as_str());

    let (tx, mut rx) = socket.split();
    let sink: Arc<dyn ConnectionSink> = Arc::new(WsSink::new(tx));
    let connection_id = state
        .relay
        .register_transport(&session_id, &agent_id, params.reservation_id, sink)
        .await;
    info!(%connection_id, "Transport leg connected");

    // Inbound frames are handled strictly in order; each is forwarded to the
    // agent leg or dropped, never queued.
    while let Some(result) = rx.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(_) | Message::Pong(_)) => {}
            Ok(message) => state.relay.forward_to_agent(&session_id, message).await,
            Err(err) => {
                warn!(error = %err, "Transport socket error");
                break;
            }
        }
    }

    state.relay.unregister_transport(&connection_id).await;
    info!(%connection_id, "Transport leg disconnected");
}

#[instrument(name = "agent_leg", skip_all, fields(session_id = tracing::field::Empty))]
async fn handle_agent_socket(socket: WebSocket, state: AppState, params: ConnectParams) {
    let (Some(session_id), Some(agent_id)) = (params.session_id, params.agent_id) else {
        warn!("Agent connection rejected: missing required parameters");
        reject(socket).await;
        return;
    };
    tracing::Span::current().record("session_id", session_id.as_str());

    let (tx, mut rx) = socket.split();
    let sink: Arc<dyn ConnectionSink> = Arc::new(WsSink::new(tx));
    state
        .relay
        .attach_agent(&session_id, &agent_id, params.reservation_id, sink)
        .await;
    info!("Agent leg connected");

    while let Some(result) = rx.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(_) | Message::Pong(_)) => {}
            Ok(message) => match protocol::decode_control_frame(&message) {
                Some(control_message) => {
                    control::handle_control_message(
                        &state.store,
                        &state.relay,
                        &session_id,
                        control_message,
                    )
                    .await;
                }
                None => state.relay.forward_to_transports(&session_id, message).await,
            },
            Err(err) => {
                warn!(error = %err, "Agent socket error");
                break;
            }
        }
    }

    state.relay.detach_agent(&session_id).await;
    info!("Agent leg disconnected");
}

async fn reject(mut socket: WebSocket) {
    let frame = CloseFrame {
        code: close_code::POLICY,
        reason: "Missing required parameters".into(),
    };
    let _ = socket.send(Message::Close(Some(frame))).await;
}
