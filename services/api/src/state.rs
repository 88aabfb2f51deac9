//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds all shared
//! resources: the reservation store, the session relay, the telephony
//! collaborator, and the simulation scheduler. Everything is owned here and
//! injected into handlers; nothing lives in ambient/static state.

use crate::config::Config;
use crate::providers::TelephonyProvider;
use crate::sim::SimulationScheduler;
use crate::store::ReservationStore;
use crate::ws::relay::SessionRelay;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all
/// handlers and connection tasks.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ReservationStore>,
    pub relay: Arc<SessionRelay>,
    pub telephony: Arc<dyn TelephonyProvider>,
    pub simulations: Arc<SimulationScheduler>,
    pub http: reqwest::Client,
    pub config: Arc<Config>,
}
