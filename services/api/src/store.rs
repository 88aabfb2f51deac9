//! In-Memory Reservation Repository
//!
//! All reservation state is process-local and lost on restart; the polling
//! client only ever needs the current in-flight records. The store is an
//! owned object injected through `AppState`, guarded by a `tokio` RwLock so
//! merges on the same id are linearizable.

use crate::models::CreateReservationPayload;
use bookline_core::{Reservation, ReservationStatus, StatusEvent, apply_status_event};
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct ReservationStore {
    records: RwLock<HashMap<String, Reservation>>,
}

impl ReservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new reservation in `pending` with all confirmed-* fields
    /// unset and a fresh, never-reused id.
    pub async fn create(&self, payload: &CreateReservationPayload) -> Reservation {
        let reservation = Reservation {
            id: Uuid::new_v4().to_string(),
            name: payload.name.clone(),
            phone_number: payload.phone_number.clone(),
            party_size: payload.party_size,
            date: payload.date.clone(),
            time: payload.time.clone(),
            special_requests: payload.special_requests.clone(),
            status: ReservationStatus::Pending,
            status_message: None,
            status_details: None,
            final_date_time: None,
            person_name: None,
            confirmed_party_size: None,
            special_instructions: None,
            created_at: Utc::now(),
        };
        self.records
            .write()
            .await
            .insert(reservation.id.clone(), reservation.clone());
        reservation
    }

    pub async fn get(&self, id: &str) -> Option<Reservation> {
        self.records.read().await.get(id).cloned()
    }

    /// Applies a status event to the record with the given id and writes the
    /// merged result back under the write lock. `None` means the id is
    /// unknown, which callers map to a not-found condition.
    pub async fn merge_status(&self, id: &str, event: &StatusEvent) -> Option<Reservation> {
        let mut records = self.records.write().await;
        let current = records.get(id)?;
        let merged = apply_status_event(current, event);
        records.insert(id.to_string(), merged.clone());
        Some(merged)
    }

    /// The most recently created reservations, newest first.
    pub async fn list_recent(&self, limit: usize) -> Vec<Reservation> {
        let mut all: Vec<Reservation> = self.records.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all.truncate(limit);
        all
    }
}
