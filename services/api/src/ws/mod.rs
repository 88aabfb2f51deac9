//! WebSocket Session Relay
//!
//! This module binds the phone call's transport leg to the voice agent's
//! conversation leg and relays traffic between them. It is structured into
//! submodules for clarity:
//!
//! - `relay`: the session and transport registries and forwarding rules.
//! - `protocol`: the typed control-message format spoken on the agent leg.
//! - `control`: interprets control messages into status events and replies.
//! - `session`: the WebSocket connection lifecycle for both legs.

pub mod control;
pub mod protocol;
pub mod relay;
pub mod session;

pub use session::{agent_ws_handler, stream_ws_handler};

#[cfg(test)]
pub(crate) mod testing {
    use super::relay::{ConnectionSink, SinkError};
    use async_trait::async_trait;
    use axum::extract::ws::Message;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::mpsc;

    /// A channel-backed [`ConnectionSink`] so relay behavior can be observed
    /// without real sockets.
    pub(crate) struct RecordingSink {
        tx: mpsc::UnboundedSender<Message>,
        closed: AtomicBool,
    }

    impl RecordingSink {
        pub(crate) fn channel() -> (Arc<Self>, mpsc::UnboundedReceiver<Message>) {
            let (tx, rx) = mpsc::unbounded_channel();
            (
                Arc::new(Self {
                    tx,
                    closed: AtomicBool::new(false),
                }),
                rx,
            )
        }

        pub(crate) fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ConnectionSink for RecordingSink {
        async fn send(&self, message: Message) -> Result<(), SinkError> {
            self.tx
                .send(message)
                .map_err(|e| SinkError(e.to_string()))
        }

        async fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }
}
