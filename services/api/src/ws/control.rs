//! The control-message interpreter.
//!
//! Decoded control messages from the agent leg land here and are turned into
//! reservation status events or synchronous function replies. A session with
//! no bound reservation makes completion events a no-op; function replies go
//! back over the session's live agent-leg handle.

use super::protocol::{
    AgentReply, AvailabilityResult, CompletionResult, ConfirmationResult, ControlMessage,
    FunctionArgs,
};
use super::relay::SessionRelay;
use crate::store::ReservationStore;
use axum::extract::ws::Message;
use bookline_core::{ReservationStatus, StatusEvent, format_confirmed_date_time};
use tracing::{debug, info, warn};

const CONFIRMED_DETAILS: &str = "The restaurant has confirmed your reservation";
const DECLINED_DETAILS: &str =
    "The restaurant was unable to accommodate the reservation at the requested time";

pub async fn handle_control_message(
    store: &ReservationStore,
    relay: &SessionRelay,
    session_id: &str,
    message: ControlMessage,
) {
    match message {
        ControlMessage::Completion { result } => {
            handle_completion(store, relay, session_id, result).await;
        }
        ControlMessage::FunctionCall {
            id,
            function,
            arguments,
        } => {
            handle_function_call(store, relay, session_id, id, &function, arguments).await;
        }
    }
}

/// The conversation ended. Exactly one status merge per completion, and only
/// for sessions bound to a reservation.
async fn handle_completion(
    store: &ReservationStore,
    relay: &SessionRelay,
    session_id: &str,
    result: Option<CompletionResult>,
) {
    info!(%session_id, "Conversation completed");
    let Some(reservation_id) = relay.session_reservation(session_id).await else {
        debug!(%session_id, "Completed session carries no reservation; nothing to update");
        return;
    };

    let success = result.as_ref().is_some_and(|r| r.success);
    let event = if success {
        StatusEvent {
            status: ReservationStatus::Success,
            status_message: Some("Reservation confirmed".to_string()),
            status_details: Some(CONFIRMED_DETAILS.to_string()),
            final_date_time: result.and_then(|r| r.confirmed_date_time),
            ..StatusEvent::default()
        }
    } else {
        StatusEvent {
            status: ReservationStatus::Error,
            status_message: Some("Reservation failed".to_string()),
            status_details: Some(DECLINED_DETAILS.to_string()),
            ..StatusEvent::default()
        }
    };

    match store.merge_status(&reservation_id, &event).await {
        Some(updated) => info!(%reservation_id, status = %updated.status, "Reservation updated from completion"),
        None => warn!(%reservation_id, "Completion referenced an unknown reservation"),
    }
}

async fn handle_function_call(
    store: &ReservationStore,
    relay: &SessionRelay,
    session_id: &str,
    id: Option<String>,
    function: &str,
    arguments: FunctionArgs,
) {
    info!(%session_id, function, "Function call from agent");
    match function {
        "checkAvailability" => {
            let result = AvailabilityResult {
                available: true,
                alternative_times: vec!["18:30", "19:30", "20:00"],
            };
            send_function_result(relay, session_id, id, serde_json::json!(result)).await;
        }
        "confirmReservation" => {
            let result = ConfirmationResult {
                success: true,
                confirmation_code: format!("RES{}", rand::random::<u32>() % 10_000),
            };
            send_function_result(relay, session_id, id, serde_json::json!(result)).await;

            let Some(reservation_id) = relay.session_reservation(session_id).await else {
                debug!(%session_id, "confirmReservation on session without reservation");
                return;
            };

            let final_date_time = match (arguments.date.as_deref(), arguments.time.as_deref()) {
                (Some(date), Some(time)) if !date.is_empty() && !time.is_empty() => {
                    Some(format_confirmed_date_time(date, time))
                }
                _ => None,
            };
            let event = StatusEvent {
                status: ReservationStatus::Success,
                status_message: Some("Reservation confirmed".to_string()),
                status_details: Some(CONFIRMED_DETAILS.to_string()),
                final_date_time,
                confirmed_party_size: arguments.party_size.as_ref().and_then(|p| p.as_u32()),
                special_instructions: arguments.special_instructions,
                ..StatusEvent::default()
            };
            if store.merge_status(&reservation_id, &event).await.is_none() {
                warn!(%reservation_id, "confirmReservation referenced an unknown reservation");
            }
        }
        // Conservative default: an unrecognized function gets no reply at all.
        other => {
            debug!(%session_id, function = other, "Ignoring unrecognized agent function");
        }
    }
}

async fn send_function_result(
    relay: &SessionRelay,
    session_id: &str,
    id: Option<String>,
    result: serde_json::Value,
) {
    let Some(sink) = relay.agent_sink(session_id).await else {
        warn!(%session_id, "No agent-leg handle to answer function call");
        return;
    };
    let reply = AgentReply::FunctionResult { id, result };
    if let Ok(json) = serde_json::to_string(&reply) {
        if let Err(err) = sink.send(Message::Text(json.into())).await {
            warn!(%session_id, error = %err, "Failed to send function result");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateReservationPayload;
    use crate::ws::protocol::decode_control_frame;
    use crate::ws::testing::RecordingSink;
    use tokio::sync::mpsc::UnboundedReceiver;

    async fn setup() -> (ReservationStore, SessionRelay, String, UnboundedReceiver<Message>) {
        let store = ReservationStore::new();
        let reservation = store
            .create(&CreateReservationPayload {
                name: "Jane".into(),
                phone_number: "+15551234567".into(),
                party_size: 4,
                date: "2025-04-23".into(),
                time: "19:30".into(),
                special_requests: None,
            })
            .await;

        let relay = SessionRelay::new();
        let (transport, _transport_rx) = RecordingSink::channel();
        relay
            .register_transport("s1", "agent-1", Some(reservation.id.clone()), transport)
            .await;
        let (agent, agent_rx) = RecordingSink::channel();
        relay.attach_agent("s1", "agent-1", None, agent).await;

        (store, relay, reservation.id, agent_rx)
    }

    fn control(json: &'static str) -> ControlMessage {
        decode_control_frame(&Message::Text(json.into())).expect("control message")
    }

    #[tokio::test]
    async fn successful_completion_confirms_the_reservation() {
        let (store, relay, id, _agent_rx) = setup().await;

        let msg = control(r#"{"type":"completion","result":{"success":true}}"#);
        handle_control_message(&store, &relay, "s1", msg).await;

        let r = store.get(&id).await.unwrap();
        assert_eq!(r.status, ReservationStatus::Success);
        assert_eq!(r.status_message.as_deref(), Some("Reservation confirmed"));
        assert!(r.final_date_time.is_none());
    }

    #[tokio::test]
    async fn completion_carries_the_confirmed_date_time_when_present() {
        let (store, relay, id, _agent_rx) = setup().await;

        let msg = control(
            r#"{"type":"completion","result":{"success":true,"confirmedDateTime":"Wednesday at 7"}}"#,
        );
        handle_control_message(&store, &relay, "s1", msg).await;

        let r = store.get(&id).await.unwrap();
        assert_eq!(r.final_date_time.as_deref(), Some("Wednesday at 7"));
    }

    #[tokio::test]
    async fn failed_completion_marks_the_reservation_errored() {
        let (store, relay, id, _agent_rx) = setup().await;

        let msg = control(r#"{"type":"completion","result":{"success":false}}"#);
        handle_control_message(&store, &relay, "s1", msg).await;

        let r = store.get(&id).await.unwrap();
        assert_eq!(r.status, ReservationStatus::Error);
        assert_eq!(r.status_message.as_deref(), Some("Reservation failed"));
    }

    #[tokio::test]
    async fn completion_without_reservation_is_a_no_op() {
        let store = ReservationStore::new();
        let relay = SessionRelay::new();
        let (agent, _agent_rx) = RecordingSink::channel();
        relay.attach_agent("s1", "agent-1", None, agent).await;

        let msg = control(r#"{"type":"completion","result":{"success":true}}"#);
        handle_control_message(&store, &relay, "s1", msg).await;
        assert!(store.list_recent(10).await.is_empty());
    }

    #[tokio::test]
    async fn check_availability_answers_synchronously() {
        let (store, relay, _id, mut agent_rx) = setup().await;

        let msg = control(
            r#"{"type":"function_call","id":"f1","function":"checkAvailability","arguments":{}}"#,
        );
        handle_control_message(&store, &relay, "s1", msg).await;

        let Message::Text(reply) = agent_rx.recv().await.unwrap() else {
            panic!("expected text reply");
        };
        let value: serde_json::Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(value["type"], "function_result");
        assert_eq!(value["id"], "f1");
        assert_eq!(value["result"]["available"], true);
    }

    #[tokio::test]
    async fn confirm_reservation_replies_and_updates_the_record() {
        let (store, relay, id, mut agent_rx) = setup().await;

        let msg = control(
            r#"{"type":"function_call","id":"f2","function":"confirmReservation",
                "arguments":{"date":"2025-04-23","time":"19:30","partySize":4,
                             "specialInstructions":"Corner table"}}"#,
        );
        handle_control_message(&store, &relay, "s1", msg).await;

        let Message::Text(reply) = agent_rx.recv().await.unwrap() else {
            panic!("expected text reply");
        };
        let value: serde_json::Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(value["result"]["success"], true);
        let code = value["result"]["confirmationCode"].as_str().unwrap();
        assert!(code.starts_with("RES"));

        let r = store.get(&id).await.unwrap();
        assert_eq!(r.status, ReservationStatus::Success);
        assert_eq!(
            r.final_date_time.as_deref(),
            Some("Wednesday, April 23, 2025 at 7:30 PM")
        );
        assert_eq!(r.confirmed_party_size, Some(4));
        assert_eq!(r.special_instructions.as_deref(), Some("Corner table"));
    }

    #[tokio::test]
    async fn unknown_functions_get_no_reply() {
        let (store, relay, id, mut agent_rx) = setup().await;

        let msg = control(
            r#"{"type":"function_call","id":"f3","function":"orderDessert","arguments":{}}"#,
        );
        handle_control_message(&store, &relay, "s1", msg).await;

        assert!(agent_rx.try_recv().is_err());
        let r = store.get(&id).await.unwrap();
        assert_eq!(r.status, ReservationStatus::Pending);
    }
}
