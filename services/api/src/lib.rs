//! Bookline API Library Crate
//!
//! This library contains all the logic for the reservation web service:
//! the application state, the in-memory reservation store, the call
//! initiator, the external provider clients, the WebSocket session relay,
//! API handlers, and routing. The `api` binary is a thin wrapper around it.

pub mod call;
pub mod config;
pub mod handlers;
pub mod models;
pub mod providers;
pub mod router;
pub mod sim;
pub mod state;
pub mod store;
pub mod ws;
