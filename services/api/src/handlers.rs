//! Axum Handlers for the REST API
//!
//! This module contains the logic for handling HTTP requests for the
//! reservation surface. It uses `utoipa` doc comments to generate OpenAPI
//! documentation.

use axum::{
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use bookline_core::{Reservation, ReservationStatus, StatusEvent, format_confirmed_date_time};
use tracing::{error, info, warn};

use crate::{
    call,
    models::{
        AgentResponseAck, AgentResponsePayload, CallStatusPayload, CreateReservationPayload,
        ErrorResponse, MessageResponse, RecentQuery,
    },
    state::AppState,
};

const DEFAULT_RECENT_LIMIT: usize = 10;

pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Create a new reservation and start the outbound call for it.
#[utoipa::path(
    post,
    path = "/api/reservations",
    request_body = CreateReservationPayload,
    responses(
        (status = 201, description = "Reservation created; the call is being placed", body = Reservation),
        (status = 400, description = "Validation failure", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn create_reservation(
    State(state): State<AppState>,
    payload: Result<Json<CreateReservationPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    payload.validate().map_err(ApiError::BadRequest)?;

    let reservation = state.store.create(&payload).await;
    info!(reservation_id = %reservation.id, "Reservation created");

    // The call is placed asynchronously; the client polls for the outcome.
    let call_state = state.clone();
    let reservation_id = reservation.id.clone();
    tokio::spawn(call::initiate_call(call_state, reservation_id));

    Ok((StatusCode::CREATED, Json(reservation)))
}

/// Fetch a single reservation by id.
#[utoipa::path(
    get,
    path = "/api/reservations/{id}",
    responses(
        (status = 200, description = "Reservation details", body = Reservation),
        (status = 404, description = "Reservation not found", body = ErrorResponse)
    ),
    params(("id" = String, Path, description = "Reservation id"))
)]
pub async fn get_reservation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Reservation>, ApiError> {
    let reservation = state
        .store
        .get(&id)
        .await
        .ok_or_else(|| ApiError::NotFound("Reservation not found".to_string()))?;
    Ok(Json(reservation))
}

/// List the most recent reservations, newest first.
#[utoipa::path(
    get,
    path = "/api/reservations",
    responses(
        (status = 200, description = "Recent reservations", body = [Reservation])
    ),
    params(("limit" = Option<usize>, Query, description = "Maximum number of records (default 10)"))
)]
pub async fn list_reservations(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Json<Vec<Reservation>> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    Json(state.store.list_recent(limit).await)
}

/// Reset a reservation to pending and place the call again.
#[utoipa::path(
    post,
    path = "/api/reservations/{id}/retry",
    responses(
        (status = 200, description = "Retry initiated", body = MessageResponse),
        (status = 404, description = "Reservation not found", body = ErrorResponse)
    ),
    params(("id" = String, Path, description = "Reservation id"))
)]
pub async fn retry_reservation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .store
        .get(&id)
        .await
        .ok_or_else(|| ApiError::NotFound("Reservation not found".to_string()))?;

    // A pending simulated outcome from the previous attempt must not land on
    // top of the retry's own call.
    if state.simulations.cancel(&id).await {
        info!(reservation_id = %id, "Cancelled scheduled simulation before retry");
    }

    state
        .store
        .merge_status(
            &id,
            &StatusEvent::with_message(ReservationStatus::Pending, "Retrying reservation call"),
        )
        .await;

    let call_state = state.clone();
    let reservation_id = id.clone();
    tokio::spawn(call::initiate_call(call_state, reservation_id));

    Ok(Json(MessageResponse {
        message: "Reservation call retry initiated".to_string(),
    }))
}

/// Telephony-provider status callback.
#[utoipa::path(
    post,
    path = "/api/call-status",
    request_body = CallStatusPayload,
    responses(
        (status = 200, description = "Updated reservation", body = Reservation),
        (status = 400, description = "Malformed status update", body = ErrorResponse),
        (status = 404, description = "Reservation not found", body = ErrorResponse)
    )
)]
pub async fn call_status(
    State(state): State<AppState>,
    payload: Result<Json<CallStatusPayload>, JsonRejection>,
) -> Result<Json<Reservation>, ApiError> {
    let Json(payload) = payload?;
    let id = payload.id.clone();
    let updated = state
        .store
        .merge_status(&id, &payload.into_event())
        .await
        .ok_or_else(|| ApiError::NotFound("Reservation not found".to_string()))?;
    info!(reservation_id = %id, status = %updated.status, "Call status applied");
    Ok(Json(updated))
}

/// Voice-agent outcome callback.
///
/// `status` is the only mandatory field. When no reservation id is supplied
/// the most recent reservation is assumed; that is inherently racy with
/// concurrent in-flight calls and kept only for compatibility with agents
/// that cannot echo the correlation id.
#[utoipa::path(
    post,
    path = "/api/agent-response",
    request_body = AgentResponsePayload,
    responses(
        (status = 200, description = "Agent response processed", body = AgentResponseAck),
        (status = 400, description = "Missing or invalid status", body = ErrorResponse),
        (status = 404, description = "Reservation not found", body = ErrorResponse)
    )
)]
pub async fn agent_response(
    State(state): State<AppState>,
    payload: Result<Json<AgentResponsePayload>, JsonRejection>,
) -> Result<Json<AgentResponseAck>, ApiError> {
    let Json(payload) = payload?;

    let status: ReservationStatus = payload
        .status
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("Missing required status parameter".to_string()))?
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid status parameter".to_string()))?;

    let id = match payload.reservation_id.clone() {
        Some(id) => id.into_text(),
        None => {
            warn!("Agent response without reservation id; falling back to most recent reservation");
            state
                .store
                .list_recent(1)
                .await
                .into_iter()
                .next()
                .map(|r| r.id)
                .ok_or_else(|| ApiError::NotFound("No reservations found".to_string()))?
        }
    };

    let event = agent_response_event(status, &payload);
    let updated = state
        .store
        .merge_status(&id, &event)
        .await
        .ok_or_else(|| ApiError::NotFound("Reservation not found".to_string()))?;
    info!(reservation_id = %id, status = %updated.status, "Agent response applied");

    Ok(Json(AgentResponseAck {
        success: true,
        message: "Agent response processed successfully".to_string(),
        reservation: updated,
    }))
}

/// Derives the status event for an agent response, filling in per-status
/// default messaging the way the voice agent expects it to read.
fn agent_response_event(status: ReservationStatus, payload: &AgentResponsePayload) -> StatusEvent {
    let mut event = StatusEvent {
        status,
        status_message: Some(
            payload
                .status_message
                .clone()
                .unwrap_or_else(|| "Reservation response received".to_string()),
        ),
        person_name: payload.person_name.clone(),
        confirmed_party_size: payload.party_size.as_ref().and_then(|p| p.as_u32()),
        special_instructions: payload.special_instructions.clone(),
        ..StatusEvent::default()
    };

    match status {
        ReservationStatus::Success => {
            event.status_details =
                Some("The restaurant has confirmed your reservation".to_string());
            match (
                payload.confirmed_date.as_deref(),
                payload.confirmed_time.as_deref(),
            ) {
                (Some(date), Some(time)) if !date.is_empty() && !time.is_empty() => {
                    event.final_date_time = Some(format_confirmed_date_time(date, time));
                }
                _ => {}
            }
        }
        ReservationStatus::Error => {
            if payload.status_message.is_none() {
                event.status_message =
                    Some("The restaurant was unable to accommodate the reservation".to_string());
            }
            event.status_details = Some(
                "The restaurant was unable to accommodate the reservation at the requested time"
                    .to_string(),
            );
        }
        ReservationStatus::NotReached => {
            if payload.status_message.is_none() {
                event.status_message = Some("Unable to connect with the restaurant".to_string());
            }
            event.status_details = Some(
                "We couldn't connect with the restaurant. The line may be busy or they might be \
                 closed."
                    .to_string(),
            );
        }
        ReservationStatus::Pending => {}
    }

    event
}
