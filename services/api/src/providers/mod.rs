//! External collaborators: the telephony provider that places the outbound
//! call and the voice-agent provider that drives the conversation.
//!
//! Both are behind traits so the call initiator can be exercised in tests
//! without network access.

pub mod elevenlabs;
pub mod twilio;

use async_trait::async_trait;

/// Everything the voice agent needs to conduct one reservation call, plus the
/// reservation id it must echo back for correlation.
#[derive(Debug, Clone)]
pub struct ReservationDetails {
    pub reservation_id: String,
    pub name: String,
    pub phone_number: String,
    pub date: String,
    pub time: String,
    pub party_size: u32,
    pub special_requests: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum TelephonyError {
    /// The account is not permitted to call this destination. Recognized
    /// specifically so the caller can fall back to simulation instead of
    /// failing the reservation.
    #[error("international permissions are not enabled for this destination")]
    InternationalPermissions,
    #[error("telephony request failed: {0}")]
    Request(String),
}

/// Outcome of dispatching an outbound call.
#[derive(Debug, Clone)]
pub struct CallPlacement {
    pub call_sid: String,
    pub agent_id: String,
    /// True when the provider could not place a real call (jurisdiction or
    /// permission limits) and synthesized a call identifier instead.
    pub simulated: bool,
}

#[async_trait]
pub trait TelephonyProvider: Send + Sync {
    /// Primes the voice agent with the reservation context and places the
    /// outbound call, registering `callback_url` for delivery-status updates.
    async fn make_reservation_call(
        &self,
        details: &ReservationDetails,
        callback_url: &str,
    ) -> Result<CallPlacement, TelephonyError>;
}

#[derive(Debug, thiserror::Error)]
#[error("voice agent request failed: {0}")]
pub struct VoiceAgentError(pub String);

/// Handle to a primed agent conversation.
#[derive(Debug, Clone)]
pub struct AgentConversation {
    pub agent_id: String,
    pub call_sid: String,
}

#[async_trait]
pub trait VoiceAgentProvider: Send + Sync {
    /// Hands the reservation context to the conversational agent and returns
    /// the conversation handle it will run under.
    async fn start_conversation(
        &self,
        details: &ReservationDetails,
    ) -> Result<AgentConversation, VoiceAgentError>;
}
