//! The session relay registries.
//!
//! Two pools of live connections share a session id: transport-leg
//! connections (one per phone-call media stream, many-to-one against a
//! session) and agent-leg connections (at most one live per session). The
//! relay owns both registries; the maps are guarded by `RwLock` and each
//! session entry by its own `Mutex`, so attach/detach/replace are mutually
//! exclusive per key while distinct sessions proceed independently.
//!
//! Messages are forwarded promptly or dropped, never buffered: a transport
//! frame that arrives before the agent leg attaches is logged and discarded,
//! which bounds memory under a slow or absent counterpart.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, stream::SplitSink};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
#[error("connection send failed: {0}")]
pub struct SinkError(pub String);

/// The send half of a bidirectional connection, abstracted so relay
/// semantics can be exercised in tests without real sockets.
#[async_trait]
pub trait ConnectionSink: Send + Sync {
    async fn send(&self, message: Message) -> Result<(), SinkError>;
    async fn close(&self);
}

/// A [`ConnectionSink`] over the write half of an axum WebSocket.
pub struct WsSink {
    tx: Mutex<SplitSink<WebSocket, Message>>,
}

impl WsSink {
    pub fn new(tx: SplitSink<WebSocket, Message>) -> Self {
        Self { tx: Mutex::new(tx) }
    }
}

#[async_trait]
impl ConnectionSink for WsSink {
    async fn send(&self, message: Message) -> Result<(), SinkError> {
        self.tx
            .lock()
            .await
            .send(message)
            .await
            .map_err(|e| SinkError(e.to_string()))
    }

    async fn close(&self) {
        let _ = self.tx.lock().await.send(Message::Close(None)).await;
    }
}

/// Connection state of a session's agent leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connecting,
    Connected,
    Disconnected,
}

/// One voice-agent conversation, keyed by session id.
struct AgentSession {
    agent_id: String,
    reservation_id: Option<String>,
    state: LinkState,
    /// The live agent-leg send handle. At most one per session; a newly
    /// attaching agent leg replaces it, demoting the old one to closed.
    sink: Option<Arc<dyn ConnectionSink>>,
}

/// One transport-leg connection, keyed by its own connection id.
struct TransportConn {
    session_id: String,
    agent_id: String,
    reservation_id: Option<String>,
    sink: Arc<dyn ConnectionSink>,
}

#[derive(Default)]
pub struct SessionRelay {
    sessions: RwLock<HashMap<String, Arc<Mutex<AgentSession>>>>,
    transports: RwLock<HashMap<String, TransportConn>>,
}

impl SessionRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a transport-leg connection, creating its session in
    /// `Connecting` state if this is the first reference to the session id.
    /// Returns the locally generated connection id.
    pub async fn register_transport(
        &self,
        session_id: &str,
        agent_id: &str,
        reservation_id: Option<String>,
        sink: Arc<dyn ConnectionSink>,
    ) -> String {
        let connection_id = format!("stream-{}", Uuid::new_v4());
        self.transports.write().await.insert(
            connection_id.clone(),
            TransportConn {
                session_id: session_id.to_string(),
                agent_id: agent_id.to_string(),
                reservation_id: reservation_id.clone(),
                sink,
            },
        );

        let mut sessions = self.sessions.write().await;
        if !sessions.contains_key(session_id) {
            sessions.insert(
                session_id.to_string(),
                Arc::new(Mutex::new(AgentSession {
                    agent_id: agent_id.to_string(),
                    reservation_id,
                    state: LinkState::Connecting,
                    sink: None,
                })),
            );
            info!(%session_id, "Created session awaiting agent leg");
        }
        connection_id
    }

    /// Removes a transport-leg connection. When it was the last transport leg
    /// referencing its session, the session is torn down: the agent-leg
    /// handle (if any) is closed and the session record removed.
    pub async fn unregister_transport(&self, connection_id: &str) {
        let mut transports = self.transports.write().await;
        let Some(removed) = transports.remove(connection_id) else {
            return;
        };
        let has_siblings = transports
            .values()
            .any(|conn| conn.session_id == removed.session_id);
        drop(transports);

        if has_siblings {
            return;
        }

        let session = self.sessions.write().await.remove(&removed.session_id);
        if let Some(session) = session {
            let mut session = session.lock().await;
            session.state = LinkState::Disconnected;
            if let Some(sink) = session.sink.take() {
                sink.close().await;
            }
            info!(
                session_id = %removed.session_id,
                agent_id = %removed.agent_id,
                reservation_id = ?removed.reservation_id,
                "Last transport leg closed; session torn down"
            );
        }
    }

    /// Attaches (or replaces) the agent leg of a session and marks it
    /// `Connected`. If no session exists yet, one is created directly in
    /// `Connected` state carrying the agent leg's own reservation id.
    pub async fn attach_agent(
        &self,
        session_id: &str,
        agent_id: &str,
        reservation_id: Option<String>,
        sink: Arc<dyn ConnectionSink>,
    ) {
        let mut sessions = self.sessions.write().await;
        match sessions.get(session_id) {
            Some(entry) => {
                let mut session = entry.lock().await;
                // The previous handle is simply discarded: at most one live
                // writer per session.
                session.sink = Some(sink);
                session.state = LinkState::Connected;
                debug!(%session_id, "Agent leg attached to existing session");
            }
            None => {
                sessions.insert(
                    session_id.to_string(),
                    Arc::new(Mutex::new(AgentSession {
                        agent_id: agent_id.to_string(),
                        reservation_id,
                        state: LinkState::Connected,
                        sink: Some(sink),
                    })),
                );
                info!(%session_id, "Agent leg created new session");
            }
        }
    }

    /// Marks the session's agent leg disconnected and clears its handle. The
    /// session record stays: a transport leg may still be attached and a
    /// replacement agent leg may arrive later.
    pub async fn detach_agent(&self, session_id: &str) {
        let entry = self.sessions.read().await.get(session_id).cloned();
        if let Some(entry) = entry {
            let mut session = entry.lock().await;
            session.state = LinkState::Disconnected;
            session.sink = None;
        }
    }

    /// Forwards a transport-leg message to the session's agent leg. Dropped
    /// (with a log line) unless the session is currently connected.
    pub async fn forward_to_agent(&self, session_id: &str, message: Message) {
        let entry = self.sessions.read().await.get(session_id).cloned();
        let sink = match entry {
            Some(entry) => {
                let session = entry.lock().await;
                if session.state == LinkState::Connected {
                    session.sink.clone()
                } else {
                    None
                }
            }
            None => None,
        };

        match sink {
            Some(sink) => {
                if let Err(err) = sink.send(message).await {
                    warn!(%session_id, error = %err, "Failed to forward to agent leg");
                }
            }
            None => {
                debug!(%session_id, "No connected agent leg for session; dropping message");
            }
        }
    }

    /// Fans an agent-leg message out to every transport-leg connection
    /// sharing the session id.
    pub async fn forward_to_transports(&self, session_id: &str, message: Message) {
        let sinks: Vec<Arc<dyn ConnectionSink>> = self
            .transports
            .read()
            .await
            .values()
            .filter(|conn| conn.session_id == session_id)
            .map(|conn| conn.sink.clone())
            .collect();

        for sink in sinks {
            if let Err(err) = sink.send(message.clone()).await {
                warn!(%session_id, error = %err, "Failed to forward to transport leg");
            }
        }
    }

    /// The reservation id the session is bound to, if any.
    pub async fn session_reservation(&self, session_id: &str) -> Option<String> {
        let entry = self.sessions.read().await.get(session_id).cloned()?;
        let session = entry.lock().await;
        session.reservation_id.clone()
    }

    /// The live agent-leg handle for a session, if one is attached.
    pub async fn agent_sink(&self, session_id: &str) -> Option<Arc<dyn ConnectionSink>> {
        let entry = self.sessions.read().await.get(session_id).cloned()?;
        let session = entry.lock().await;
        session.sink.clone()
    }

    /// Current agent-leg connection state, or `None` for an unknown session.
    pub async fn session_state(&self, session_id: &str) -> Option<LinkState> {
        let entry = self.sessions.read().await.get(session_id).cloned()?;
        let state = entry.lock().await.state;
        Some(state)
    }

    /// The agent driving the session, or `None` for an unknown session.
    pub async fn session_agent(&self, session_id: &str) -> Option<String> {
        let entry = self.sessions.read().await.get(session_id).cloned()?;
        let agent_id = entry.lock().await.agent_id.clone();
        Some(agent_id)
    }
}
