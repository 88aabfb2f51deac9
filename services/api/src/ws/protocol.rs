//! The control-message protocol spoken on the agent leg.
//!
//! Anything the agent sends that decodes as one of these shapes is intercepted
//! and handled locally; everything else, including JSON of unrecognized
//! shapes, is opaque media and relayed untouched. Classification is a typed
//! decode attempt, never a thrown error: a frame that merely looks structural
//! but fails to decode is forwarded rather than dropped, so a real audio frame
//! can never be lost to misclassification.

use crate::models::NumberOrText;
use axum::extract::ws::Message;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Structured messages the agent leg can address to the relay itself.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// The conversation finished; `result` carries the outcome.
    Completion {
        #[serde(default)]
        result: Option<CompletionResult>,
    },
    /// The agent invokes a server-side function mid-conversation.
    FunctionCall {
        #[serde(default)]
        id: Option<String>,
        function: String,
        #[serde(default)]
        arguments: FunctionArgs,
    },
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub confirmed_date_time: Option<String>,
}

/// Arguments the recognized agent functions may carry.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FunctionArgs {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub party_size: Option<NumberOrText>,
    #[serde(default)]
    pub special_instructions: Option<String>,
}

/// Replies sent back over the agent leg.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentReply {
    FunctionResult {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        result: serde_json::Value,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResult {
    pub available: bool,
    pub alternative_times: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationResult {
    pub success: bool,
    pub confirmation_code: String,
}

/// Attempts to decode an inbound frame as a control message.
///
/// Only frames that start with an object-opening token are even considered;
/// binary frames must additionally be valid UTF-8. `None` means "opaque
/// media, forward it".
pub fn decode_control_frame(message: &Message) -> Option<ControlMessage> {
    let text: &str = match message {
        Message::Text(text) if text.starts_with('{') => text,
        Message::Binary(data) if data.first() == Some(&b'{') => std::str::from_utf8(data).ok()?,
        _ => return None,
    };
    match serde_json::from_str(text) {
        Ok(control) => Some(control),
        Err(err) => {
            debug!(error = %err, "Structural-looking frame is not a control message; forwarding");
            None
        }
    }
}
