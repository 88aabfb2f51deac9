//! API Wire Models
//!
//! Request and response bodies for the REST surface, plus the OpenAPI schema
//! derives that document them. The reservation record itself lives in
//! `bookline-core`; these are the shapes that wrap it at the HTTP boundary.

use bookline_core::{ReservationStatus, StatusEvent, Reservation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Largest party the form accepts. Bigger groups get a human on the phone.
pub const MAX_PARTY_SIZE: u32 = 20;

/// Body of `POST /api/reservations`.
#[derive(Debug, Deserialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationPayload {
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[schema(example = "+14155550123")]
    pub phone_number: String,
    #[schema(example = 4)]
    pub party_size: u32,
    #[schema(example = "2025-04-23")]
    pub date: String,
    #[schema(example = "19:30")]
    pub time: String,
    #[serde(default)]
    pub special_requests: Option<String>,
}

impl CreateReservationPayload {
    /// Field-level validation, surfaced as a 400 with the offending field named.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        if self.phone_number.trim().is_empty() {
            return Err("phoneNumber must not be empty".to_string());
        }
        if self.party_size == 0 || self.party_size > MAX_PARTY_SIZE {
            return Err(format!("partySize must be between 1 and {MAX_PARTY_SIZE}"));
        }
        if self.date.trim().is_empty() {
            return Err("date must not be empty".to_string());
        }
        if self.time.trim().is_empty() {
            return Err("time must not be empty".to_string());
        }
        Ok(())
    }
}

/// Query parameters of `GET /api/reservations`.
#[derive(Debug, Deserialize, Default)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

/// Body of `POST /api/call-status`: the status-update shape the telephony
/// provider posts back, addressed by reservation id.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CallStatusPayload {
    pub id: String,
    #[schema(example = "success")]
    pub status: ReservationStatus,
    pub status_message: Option<String>,
    pub status_details: Option<String>,
    pub final_date_time: Option<String>,
    pub person_name: Option<String>,
    pub confirmed_party_size: Option<u32>,
    pub special_instructions: Option<String>,
}

impl CallStatusPayload {
    pub fn into_event(self) -> StatusEvent {
        StatusEvent {
            status: self.status,
            status_message: self.status_message,
            status_details: self.status_details,
            final_date_time: self.final_date_time,
            person_name: self.person_name,
            confirmed_party_size: self.confirmed_party_size,
            special_instructions: self.special_instructions,
        }
    }
}

/// A JSON value the agent may send either as a number or as a string.
/// The agent platform is not consistent about this, so both are accepted.
#[derive(Debug, Deserialize, ToSchema, Clone)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(u64),
    Text(String),
}

impl NumberOrText {
    pub fn into_text(self) -> String {
        match self {
            NumberOrText::Number(n) => n.to_string(),
            NumberOrText::Text(s) => s,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            NumberOrText::Number(n) => u32::try_from(*n).ok(),
            NumberOrText::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Body of `POST /api/agent-response`: the voice agent's outcome callback.
///
/// Only `status` is mandatory, and even that is validated by hand rather than
/// by the deserializer so the endpoint can answer with the agent-friendly 400
/// instead of a generic decode error. The reservation id arrives as either
/// `reservationId` or `reservation_id`.
#[derive(Debug, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct AgentResponsePayload {
    #[serde(alias = "reservation_id")]
    pub reservation_id: Option<NumberOrText>,
    #[schema(example = "success")]
    pub status: Option<String>,
    pub status_message: Option<String>,
    pub confirmed_date: Option<String>,
    pub confirmed_time: Option<String>,
    pub special_instructions: Option<String>,
    pub party_size: Option<NumberOrText>,
    pub person_name: Option<String>,
}

/// Acknowledgement body for a processed agent response.
#[derive(Debug, Serialize, ToSchema)]
pub struct AgentResponseAck {
    pub success: bool,
    pub message: String,
    pub reservation: Reservation,
}

/// Generic acknowledgement with a human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_payload() -> CreateReservationPayload {
        CreateReservationPayload {
            name: "Jane Doe".into(),
            phone_number: "+14155550123".into(),
            party_size: 4,
            date: "2025-04-23".into(),
            time: "19:30".into(),
            special_requests: None,
        }
    }

    #[test]
    fn create_payload_accepts_valid_input() {
        assert!(valid_payload().validate().is_ok());
    }

    #[test]
    fn create_payload_rejects_blank_fields() {
        let mut p = valid_payload();
        p.name = "  ".into();
        assert!(p.validate().unwrap_err().contains("name"));

        let mut p = valid_payload();
        p.phone_number = String::new();
        assert!(p.validate().unwrap_err().contains("phoneNumber"));

        let mut p = valid_payload();
        p.time = String::new();
        assert!(p.validate().unwrap_err().contains("time"));
    }

    #[test]
    fn create_payload_bounds_party_size() {
        let mut p = valid_payload();
        p.party_size = 0;
        assert!(p.validate().is_err());
        p.party_size = MAX_PARTY_SIZE + 1;
        assert!(p.validate().is_err());
        p.party_size = MAX_PARTY_SIZE;
        assert!(p.validate().is_ok());
    }

    #[test]
    fn create_payload_deserializes_camel_case() {
        let json = r#"{
            "name": "Jane",
            "phoneNumber": "+1555",
            "partySize": 2,
            "date": "2025-04-23",
            "time": "19:30"
        }"#;
        let p: CreateReservationPayload = serde_json::from_str(json).unwrap();
        assert_eq!(p.phone_number, "+1555");
        assert_eq!(p.party_size, 2);
        assert!(p.special_requests.is_none());
    }

    #[test]
    fn agent_response_accepts_both_reservation_id_keys() {
        let camel: AgentResponsePayload =
            serde_json::from_str(r#"{"reservationId": "abc", "status": "success"}"#).unwrap();
        assert_eq!(camel.reservation_id.unwrap().into_text(), "abc");

        let snake: AgentResponsePayload =
            serde_json::from_str(r#"{"reservation_id": "abc", "status": "success"}"#).unwrap();
        assert_eq!(snake.reservation_id.unwrap().into_text(), "abc");
    }

    #[test]
    fn agent_response_accepts_numeric_reservation_id_and_party_size() {
        let p: AgentResponsePayload =
            serde_json::from_str(r#"{"reservationId": 42, "status": "success", "partySize": "6"}"#)
                .unwrap();
        assert_eq!(p.reservation_id.unwrap().into_text(), "42");
        assert_eq!(p.party_size.unwrap().as_u32(), Some(6));
    }

    #[test]
    fn number_or_text_rejects_garbage_party_size() {
        let p: AgentResponsePayload =
            serde_json::from_str(r#"{"status": "success", "partySize": "a few"}"#).unwrap();
        assert_eq!(p.party_size.unwrap().as_u32(), None);
    }

    #[test]
    fn call_status_payload_maps_to_event() {
        let json = r#"{
            "id": "r1",
            "status": "success",
            "statusMessage": "Reservation confirmed",
            "confirmedPartySize": 4
        }"#;
        let payload: CallStatusPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.id, "r1");
        let event = payload.into_event();
        assert_eq!(event.status, ReservationStatus::Success);
        assert_eq!(event.status_message.as_deref(), Some("Reservation confirmed"));
        assert_eq!(event.confirmed_party_size, Some(4));
        assert!(event.final_date_time.is_none());
    }
}
