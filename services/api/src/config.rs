use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// Externally reachable base URL of this service. The telephony status
    /// callback and the simulated agent callback are both built from it.
    pub public_url: String,
    pub log_level: Level,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    /// The caller ID phone number outbound calls are placed from.
    pub twilio_phone_number: String,
    pub elevenlabs_api_key: String,
    /// The pre-configured conversational agent that drives reservation calls.
    pub elevenlabs_agent_id: String,
    /// The agent's Twilio phone-number binding on the ElevenLabs side.
    pub elevenlabs_phone_number_id: String,
}

const DEFAULT_AGENT_ID: &str = "9XjNNhNDWGsAPGfwiEq9";
const DEFAULT_PHONE_NUMBER_ID: &str = "Sqdz4JrqrXoGL7D263v1";

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let public_url = std::env::var("SERVER_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", bind_address.port()))
            .trim_end_matches('/')
            .to_string();

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let twilio_account_sid = require_var("TWILIO_ACCOUNT_SID")?;
        let twilio_auth_token = require_var("TWILIO_AUTH_TOKEN")?;
        let twilio_phone_number = require_var("TWILIO_PHONE_NUMBER")?;
        let elevenlabs_api_key = require_var("ELEVENLABS_API_KEY")?;

        let elevenlabs_agent_id = std::env::var("ELEVENLABS_AGENT_ID")
            .unwrap_or_else(|_| DEFAULT_AGENT_ID.to_string());
        let elevenlabs_phone_number_id = std::env::var("ELEVENLABS_PHONE_NUMBER_ID")
            .unwrap_or_else(|_| DEFAULT_PHONE_NUMBER_ID.to_string());

        Ok(Self {
            bind_address,
            public_url,
            log_level,
            twilio_account_sid,
            twilio_auth_token,
            twilio_phone_number,
            elevenlabs_api_key,
            elevenlabs_agent_id,
            elevenlabs_phone_number_id,
        })
    }
}

fn require_var(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar(name.to_string()))
}
