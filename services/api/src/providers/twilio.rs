//! Twilio telephony client.
//!
//! Places the outbound call after priming the voice agent. Twilio error code
//! 21215 (geo-permissions) is mapped to a simulated placement rather than a
//! failure so reservations to unreachable jurisdictions still complete
//! through the simulation path.

use super::{
    CallPlacement, ReservationDetails, TelephonyError, TelephonyProvider, VoiceAgentProvider,
};
use crate::config::Config;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Twilio error code for "international permissions not enabled".
const GEO_PERMISSION_ERROR: i64 = 21215;

pub struct TwilioClient {
    http: reqwest::Client,
    account_sid: String,
    auth_token: String,
    phone_number: String,
    voice_agent: Arc<dyn VoiceAgentProvider>,
}

impl TwilioClient {
    pub fn new(
        http: reqwest::Client,
        config: &Config,
        voice_agent: Arc<dyn VoiceAgentProvider>,
    ) -> Self {
        Self {
            http,
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
            phone_number: config.twilio_phone_number.clone(),
            voice_agent,
        }
    }

    /// Dispatches one call through the Twilio REST API. A geo-permission
    /// rejection yields a synthesized placement with `simulated = true`.
    async fn place_call(
        &self,
        to: &str,
        twiml: &str,
        status_callback: &str,
    ) -> Result<PlacedCall, TelephonyError> {
        let url = format!("{API_BASE}/Accounts/{}/Calls.json", self.account_sid);
        let params = [
            ("To", to),
            ("From", self.phone_number.as_str()),
            ("Twiml", twiml),
            ("StatusCallback", status_callback),
            ("StatusCallbackMethod", "POST"),
        ];

        let response = self
            .http
            .post(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| TelephonyError::Request(e.to_string()))?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TelephonyError::Request(e.to_string()))?;

        if status.is_success() {
            let sid = body
                .get("sid")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            return Ok(PlacedCall {
                sid,
                simulated: false,
            });
        }

        match body.get("code").and_then(|v| v.as_i64()) {
            Some(GEO_PERMISSION_ERROR) => {
                warn!(%to, "Twilio geo-permission rejection, falling back to simulation mode");
                Ok(PlacedCall {
                    sid: simulated_call_sid(),
                    simulated: true,
                })
            }
            _ => Err(TelephonyError::Request(format!(
                "Twilio returned {status}: {}",
                body.get("message").and_then(|v| v.as_str()).unwrap_or("")
            ))),
        }
    }
}

struct PlacedCall {
    sid: String,
    simulated: bool,
}

fn simulated_call_sid() -> String {
    format!(
        "SIMULATED_CALL_{}",
        &Uuid::new_v4().simple().to_string()[..8]
    )
}

#[async_trait]
impl TelephonyProvider for TwilioClient {
    async fn make_reservation_call(
        &self,
        details: &ReservationDetails,
        callback_url: &str,
    ) -> Result<CallPlacement, TelephonyError> {
        // Prime the agent first so it holds the reservation context before the
        // line opens. The agent handles the audio directly; the TwiML below is
        // only Twilio's side of the handshake.
        let conversation = self
            .voice_agent
            .start_conversation(details)
            .await
            .map_err(|e| TelephonyError::Request(e.to_string()))?;

        let twiml = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
            <Response><Say>Connecting your call to the reservation voice agent...</Say></Response>";

        let placed = self
            .place_call(&details.phone_number, twiml, callback_url)
            .await?;

        if placed.simulated {
            info!(to = %details.phone_number, "Using simulation mode for this destination");
        } else {
            info!(to = %details.phone_number, sid = %placed.sid, "Outbound call dispatched");
        }

        Ok(CallPlacement {
            call_sid: placed.sid,
            agent_id: conversation.agent_id,
            simulated: placed.simulated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_sids_are_distinguishable() {
        let sid = simulated_call_sid();
        assert!(sid.starts_with("SIMULATED_CALL_"));
        assert_ne!(sid, simulated_call_sid());
    }
}
