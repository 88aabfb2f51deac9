//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API, the two WebSocket legs, and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        AgentResponseAck, AgentResponsePayload, CallStatusPayload, CreateReservationPayload,
        ErrorResponse, MessageResponse, NumberOrText,
    },
    state::AppState,
    ws,
};

use axum::{
    Router,
    routing::{get, post},
};
use bookline_core::{Reservation, ReservationStatus, StatusEvent};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_reservation,
        handlers::get_reservation,
        handlers::list_reservations,
        handlers::retry_reservation,
        handlers::call_status,
        handlers::agent_response,
    ),
    components(
        schemas(
            Reservation,
            ReservationStatus,
            StatusEvent,
            CreateReservationPayload,
            CallStatusPayload,
            AgentResponsePayload,
            AgentResponseAck,
            NumberOrText,
            MessageResponse,
            ErrorResponse
        )
    ),
    tags(
        (name = "Bookline API", description = "Automated restaurant reservation calls")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: AppState) -> Router {
    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route(
            "/api/reservations",
            get(handlers::list_reservations).post(handlers::create_reservation),
        )
        .route("/api/reservations/{id}", get(handlers::get_reservation))
        .route(
            "/api/reservations/{id}/retry",
            post(handlers::retry_reservation),
        )
        .route("/api/call-status", post(handlers::call_status))
        .route("/api/agent-response", post(handlers::agent_response))
        // The two WebSocket legs of the session relay.
        .route("/stream", get(ws::stream_ws_handler))
        .route("/elevenlabs", get(ws::agent_ws_handler))
        .with_state(app_state);

    // Merge the stateful routes with the stateless Swagger UI.
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
