//! The status-event merge rule.
//!
//! Every status transition in the system, whether it comes from the telephony
//! status callback, the agent-response webhook, the WebSocket control
//! interpreter, or the simulated conversation, is expressed as a
//! [`StatusEvent`] and folded into the record by [`apply_status_event`].

use crate::reservation::{Reservation, ReservationStatus};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// One authoritative status update for a reservation.
///
/// `status` always wins. Every optional field overwrites the record only when
/// it is present and non-empty; an absent field keeps whatever the record
/// already holds.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    pub status: ReservationStatus,
    pub status_message: Option<String>,
    pub status_details: Option<String>,
    pub final_date_time: Option<String>,
    pub person_name: Option<String>,
    pub confirmed_party_size: Option<u32>,
    pub special_instructions: Option<String>,
}

impl StatusEvent {
    /// A bare status change with just a summary message.
    pub fn with_message(status: ReservationStatus, message: impl Into<String>) -> Self {
        StatusEvent {
            status,
            status_message: Some(message.into()),
            ..StatusEvent::default()
        }
    }
}

/// Applies `event` to `current`, producing the merged record.
///
/// The merge is idempotent: applying the same event twice yields the same
/// record. Later events with differing detail still overwrite field by field
/// (last writer wins); a previously confirmed value is never cleared.
pub fn apply_status_event(current: &Reservation, event: &StatusEvent) -> Reservation {
    let mut merged = current.clone();
    merged.status = event.status;
    merge_text(&mut merged.status_message, &event.status_message);
    merge_text(&mut merged.status_details, &event.status_details);
    merge_text(&mut merged.final_date_time, &event.final_date_time);
    merge_text(&mut merged.person_name, &event.person_name);
    merge_text(&mut merged.special_instructions, &event.special_instructions);
    if let Some(size) = event.confirmed_party_size {
        merged.confirmed_party_size = Some(size);
    }
    merged
}

fn merge_text(target: &mut Option<String>, incoming: &Option<String>) {
    if let Some(value) = incoming {
        if !value.is_empty() {
            *target = Some(value.clone());
        }
    }
}

/// Formats a confirmed `YYYY-MM-DD` date and `HH:MM` time as a display-ready
/// string, e.g. `"Wednesday, April 23, 2025 at 7:30 PM"`.
///
/// Inputs that do not parse fall back to the literal `"{date} {time}"`
/// concatenation; a confirmation is never lost over a formatting problem.
pub fn format_confirmed_date_time(date: &str, time: &str) -> String {
    let parsed_date = NaiveDate::parse_from_str(date, "%Y-%m-%d");
    let parsed_time = NaiveTime::parse_from_str(time, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M:%S"));
    match (parsed_date, parsed_time) {
        (Ok(d), Ok(t)) => d
            .and_time(t)
            .format("%A, %B %-d, %Y at %-I:%M %p")
            .to_string(),
        _ => format!("{date} {time}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn pending_reservation() -> Reservation {
        Reservation {
            id: "r1".into(),
            name: "Jane".into(),
            phone_number: "+15551234567".into(),
            party_size: 4,
            date: "2025-04-23".into(),
            time: "19:30".into(),
            special_requests: Some("window seat".into()),
            status: ReservationStatus::Pending,
            status_message: None,
            status_details: None,
            final_date_time: None,
            person_name: None,
            confirmed_party_size: None,
            special_instructions: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn status_always_wins() {
        let record = pending_reservation();
        let event = StatusEvent::with_message(ReservationStatus::Success, "Reservation confirmed");
        let merged = apply_status_event(&record, &event);
        assert_eq!(merged.status, ReservationStatus::Success);
        assert_eq!(merged.status_message.as_deref(), Some("Reservation confirmed"));
    }

    #[test]
    fn absent_fields_preserve_prior_values() {
        let record = pending_reservation();
        let first = StatusEvent::with_message(ReservationStatus::Pending, "Calling restaurant...");
        let after_first = apply_status_event(&record, &first);

        let second = StatusEvent {
            status: ReservationStatus::Success,
            person_name: Some("Jane".into()),
            ..StatusEvent::default()
        };
        let after_second = apply_status_event(&after_first, &second);

        assert_eq!(after_second.status, ReservationStatus::Success);
        assert_eq!(after_second.person_name.as_deref(), Some("Jane"));
        assert_eq!(
            after_second.status_message.as_deref(),
            Some("Calling restaurant...")
        );
    }

    #[test]
    fn empty_strings_are_treated_as_absent() {
        let record = pending_reservation();
        let confirm = StatusEvent {
            status: ReservationStatus::Success,
            final_date_time: Some("Wednesday, April 23, 2025 at 7:30 PM".into()),
            ..StatusEvent::default()
        };
        let confirmed = apply_status_event(&record, &confirm);

        let noisy = StatusEvent {
            status: ReservationStatus::Success,
            final_date_time: Some(String::new()),
            ..StatusEvent::default()
        };
        let merged = apply_status_event(&confirmed, &noisy);
        assert_eq!(
            merged.final_date_time.as_deref(),
            Some("Wednesday, April 23, 2025 at 7:30 PM")
        );
    }

    #[test]
    fn applying_the_same_terminal_event_twice_is_idempotent() {
        let record = pending_reservation();
        let event = StatusEvent {
            status: ReservationStatus::Error,
            status_message: Some("Reservation failed".into()),
            status_details: Some("The restaurant could not accommodate the request".into()),
            ..StatusEvent::default()
        };
        let once = apply_status_event(&record, &event);
        let twice = apply_status_event(&once, &event);
        assert_eq!(once, twice);
    }

    #[test]
    fn later_events_overwrite_field_wise() {
        let record = pending_reservation();
        let first = StatusEvent {
            status: ReservationStatus::Success,
            confirmed_party_size: Some(4),
            ..StatusEvent::default()
        };
        let second = StatusEvent {
            status: ReservationStatus::Success,
            confirmed_party_size: Some(6),
            ..StatusEvent::default()
        };
        let merged = apply_status_event(&apply_status_event(&record, &first), &second);
        assert_eq!(merged.confirmed_party_size, Some(6));
    }

    #[test]
    fn formats_full_date_time() {
        let formatted = format_confirmed_date_time("2025-04-23", "19:30");
        assert_eq!(formatted, "Wednesday, April 23, 2025 at 7:30 PM");
    }

    #[test]
    fn formats_morning_times_and_seconds() {
        assert_eq!(
            format_confirmed_date_time("2025-12-01", "09:05"),
            "Monday, December 1, 2025 at 9:05 AM"
        );
        assert_eq!(
            format_confirmed_date_time("2025-12-01", "09:05:00"),
            "Monday, December 1, 2025 at 9:05 AM"
        );
    }

    #[test]
    fn unparseable_inputs_fall_back_to_concatenation() {
        assert_eq!(
            format_confirmed_date_time("next friday", "around 7"),
            "next friday around 7"
        );
        assert_eq!(
            format_confirmed_date_time("2025-04-23", "around 7"),
            "2025-04-23 around 7"
        );
    }
}
