//! Main Entrypoint for the Bookline API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing logging.
//! 3. Constructing the shared state: store, relay, provider clients.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use bookline_api::{
    config::Config,
    providers::{elevenlabs::ElevenLabsClient, twilio::TwilioClient},
    router::create_router,
    sim::SimulationScheduler,
    state::AppState,
    store::ReservationStore,
    ws::relay::SessionRelay,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Shared State ---
    let http = reqwest::Client::new();
    let voice_agent = Arc::new(ElevenLabsClient::new(http.clone(), &config));
    let telephony = Arc::new(TwilioClient::new(http.clone(), &config, voice_agent));

    let app_state = AppState {
        store: Arc::new(ReservationStore::new()),
        relay: Arc::new(SessionRelay::new()),
        telephony,
        simulations: Arc::new(SimulationScheduler::new()),
        http,
        config: Arc::new(config.clone()),
    };

    // --- 4. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 5. Start Server ---
    info!(
        bind_address = %config.bind_address,
        public_url = %config.public_url,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server has shut down.");
    Ok(())
}
