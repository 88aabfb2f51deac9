//! The reservation record and its status enum.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Where a reservation currently stands.
///
/// A reservation is created `Pending` and stays there until an authoritative
/// event from the voice agent (or the telephony status callback) moves it to a
/// terminal status. An explicit retry is the only way back to `Pending`.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    #[default]
    Pending,
    Success,
    Error,
    #[serde(rename = "not-reached")]
    NotReached,
}

impl ReservationStatus {
    /// Anything other than `Pending` is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReservationStatus::Pending)
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReservationStatus::Pending => write!(f, "pending"),
            ReservationStatus::Success => write!(f, "success"),
            ReservationStatus::Error => write!(f, "error"),
            ReservationStatus::NotReached => write!(f, "not-reached"),
        }
    }
}

/// Error returned when parsing an unknown status string.
#[derive(Debug, thiserror::Error)]
#[error("unknown reservation status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for ReservationStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReservationStatus::Pending),
            "success" => Ok(ReservationStatus::Success),
            "error" => Ok(ReservationStatus::Error),
            "not-reached" => Ok(ReservationStatus::NotReached),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// A single reservation request and everything learned about it since.
///
/// The `confirmed_*` fields (`final_date_time`, `person_name`,
/// `confirmed_party_size`, `special_instructions`) start out `None` and are
/// only ever filled in by a qualifying status event; they are never cleared.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: String,
    pub name: String,
    pub phone_number: String,
    pub party_size: u32,
    pub date: String,
    pub time: String,
    pub special_requests: Option<String>,
    pub status: ReservationStatus,
    pub status_message: Option<String>,
    pub status_details: Option<String>,
    pub final_date_time: Option<String>,
    pub person_name: Option<String>,
    pub confirmed_party_size: Option<u32>,
    pub special_instructions: Option<String>,
    pub created_at: DateTime<Utc>,
}
