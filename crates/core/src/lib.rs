//! Domain logic for the bookline reservation service.
//!
//! This crate holds the pieces that do not depend on any runtime or I/O:
//! the reservation record itself, and the status-event merge rule that every
//! caller (HTTP callbacks, the WebSocket control interpreter, the simulated
//! agent) funnels through.

pub mod reservation;
pub mod status;

pub use reservation::{Reservation, ReservationStatus};
pub use status::{StatusEvent, apply_status_event, format_confirmed_date_time};
