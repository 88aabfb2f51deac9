//! Call initiation.
//!
//! Orchestrates placing the outbound reservation call: marks the reservation
//! pending, dispatches through the telephony collaborator, and routes every
//! failure into a stored status update. After a successful dispatch the
//! status stays `pending`; the terminal transition is always driven by a
//! later callback so this path never races the asynchronous agent.

use crate::providers::{ReservationDetails, TelephonyError};
use crate::sim;
use crate::state::AppState;
use bookline_core::{Reservation, ReservationStatus, StatusEvent};
use tracing::{error, info, instrument};

/// Initiates (or re-initiates) the outbound call for a reservation.
///
/// A missing reservation is an internal inconsistency (the caller just
/// created or retried it): it is logged and the function returns without any
/// state mutation. Every other failure ends in a status merge, so the
/// polling client never sees a reservation silently stuck in `pending`.
#[instrument(skip(state))]
pub async fn initiate_call(state: AppState, reservation_id: String) {
    let Some(reservation) = state.store.get(&reservation_id).await else {
        error!(%reservation_id, "Reservation missing at call initiation; aborting");
        return;
    };

    state
        .store
        .merge_status(
            &reservation_id,
            &StatusEvent::with_message(ReservationStatus::Pending, "Calling restaurant..."),
        )
        .await;

    let details = reservation_details(&reservation);
    let callback_url = format!("{}/api/call-status", state.config.public_url);

    match state
        .telephony
        .make_reservation_call(&details, &callback_url)
        .await
    {
        Ok(placement) if placement.simulated => {
            info!(%reservation_id, sid = %placement.call_sid, "Call simulated; scheduling conversation outcome");
            state
                .store
                .merge_status(
                    &reservation_id,
                    &StatusEvent {
                        status: ReservationStatus::Pending,
                        status_message: Some(
                            "Simulating call - International number detected".to_string(),
                        ),
                        status_details: Some(
                            "Note: The telephony account needs international permissions enabled \
                             to place real calls to this number. Using simulation mode for \
                             demonstration purposes."
                                .to_string(),
                        ),
                        ..StatusEvent::default()
                    },
                )
                .await;

            let endpoint = format!("{}/api/agent-response", state.config.public_url);
            let http = state.http.clone();
            state
                .simulations
                .schedule(reservation_id.clone(), async move {
                    sim::run_simulated_conversation(http, endpoint, details, Vec::new()).await;
                })
                .await;
        }
        Ok(placement) => {
            info!(%reservation_id, sid = %placement.call_sid, "Call dispatched; awaiting agent callback");
        }
        Err(TelephonyError::InternationalPermissions) => {
            state
                .store
                .merge_status(
                    &reservation_id,
                    &StatusEvent {
                        status: ReservationStatus::Error,
                        status_message: Some("International permissions required".to_string()),
                        status_details: Some(
                            "The telephony account needs international permissions enabled to \
                             call this number. Enable low-risk international calling in the \
                             account's geo-permission settings and retry."
                                .to_string(),
                        ),
                        ..StatusEvent::default()
                    },
                )
                .await;
        }
        Err(err) => {
            error!(%reservation_id, error = %err, "Failed to initiate restaurant call");
            state
                .store
                .merge_status(
                    &reservation_id,
                    &StatusEvent {
                        status: ReservationStatus::Error,
                        status_message: Some("Failed to initiate call".to_string()),
                        status_details: Some(
                            "There was an error connecting to the voice service. Please try \
                             again later."
                                .to_string(),
                        ),
                        ..StatusEvent::default()
                    },
                )
                .await;
        }
    }
}

fn reservation_details(reservation: &Reservation) -> ReservationDetails {
    ReservationDetails {
        reservation_id: reservation.id.clone(),
        name: reservation.name.clone(),
        phone_number: reservation.phone_number.clone(),
        date: reservation.date.clone(),
        time: reservation.time.clone(),
        party_size: reservation.party_size,
        special_requests: reservation.special_requests.clone(),
    }
}
