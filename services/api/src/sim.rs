//! Simulated conversation outcomes.
//!
//! When the telephony provider cannot place a real call, the flow still has
//! to reach a terminal status. After a realistic delay a synthesized outcome
//! is POSTed to the service's own `/api/agent-response` endpoint, the same
//! public surface the live agent uses, so both paths share one
//! state-transition entry point.
//!
//! Scheduled simulations are keyed by reservation id and cancelled when the
//! reservation is retried, so a stale simulated outcome cannot overwrite the
//! outcome of the retry's own call.

use crate::providers::ReservationDetails;
use serde_json::json;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Owns the pending simulated-conversation tasks, at most one per
/// reservation id. Scheduling for an id that already has a pending task
/// replaces (aborts) the old one.
#[derive(Default)]
pub struct SimulationScheduler {
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl SimulationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn schedule<F>(&self, reservation_id: String, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task);
        let mut tasks = self.tasks.lock().await;
        if let Some(previous) = tasks.insert(reservation_id.clone(), handle) {
            debug!(%reservation_id, "Replacing previously scheduled simulation");
            previous.abort();
        }
    }

    /// Cancels the pending simulation for `reservation_id`, if any.
    pub async fn cancel(&self, reservation_id: &str) -> bool {
        match self.tasks.lock().await.remove(reservation_id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}

/// Decides the simulated call outcome. With no recorded restaurant responses
/// the roll decides (weighted towards success); otherwise any
/// rejection-indicating response forces a failure.
pub fn simulated_outcome(restaurant_responses: &[String], roll: f64) -> bool {
    if restaurant_responses.is_empty() {
        return roll < 0.7;
    }
    !restaurant_responses.iter().any(|response| {
        let lower = response.to_lowercase();
        lower.contains("no") || lower.contains("sorry") || lower.contains("full")
    })
}

/// Runs one simulated conversation: waits 4-8 seconds, synthesizes the
/// outcome, and delivers it through the public agent-response endpoint.
pub async fn run_simulated_conversation(
    http: reqwest::Client,
    callback_url: String,
    details: ReservationDetails,
    restaurant_responses: Vec<String>,
) {
    let delay = Duration::from_millis(4000 + (rand::random::<f64>() * 4000.0) as u64);
    info!(
        reservation_id = %details.reservation_id,
        delay_ms = delay.as_millis() as u64,
        "Simulating voice conversation"
    );
    tokio::time::sleep(delay).await;

    let success = simulated_outcome(&restaurant_responses, rand::random::<f64>());

    let callback = if success {
        json!({
            "reservationId": details.reservation_id,
            "status": "success",
            "statusMessage": "Reservation confirmed",
            "confirmedDate": details.date,
            "confirmedTime": details.time,
            "personName": details.name,
            "partySize": details.party_size.to_string(),
            "specialInstructions": details
                .special_requests
                .clone()
                .unwrap_or_else(|| "No special requests".to_string()),
        })
    } else {
        json!({
            "reservationId": details.reservation_id,
            "status": "error",
            "statusMessage": "Reservation failed",
        })
    };

    match http.post(&callback_url).json(&callback).send().await {
        Ok(resp) if resp.status().is_success() => {
            info!(reservation_id = %details.reservation_id, "Simulation callback delivered");
        }
        Ok(resp) => {
            error!(
                reservation_id = %details.reservation_id,
                status = %resp.status(),
                "Simulation callback rejected"
            );
        }
        Err(err) => {
            error!(
                reservation_id = %details.reservation_id,
                error = %err,
                "Failed to deliver simulation callback"
            );
        }
    }
}
