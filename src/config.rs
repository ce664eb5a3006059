//! Bridge configuration loaded from environment variables.
//!
//! Credentials, device, region, and the registered household members are
//! supplied once at startup and read-only afterwards.

use crate::models::RegisteredUser;
use std::env;
use std::str::FromStr;
use validator::Validate;

/// Default poll interval: 5 minutes.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;

/// Vendor cloud region, selecting one of four fixed base URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Eu,
    Us,
    Cn,
    In,
}

impl Region {
    pub fn base_url(self) -> &'static str {
        match self {
            Region::Eu => "https://openapi.tuyaeu.com",
            Region::Us => "https://openapi.tuyaus.com",
            Region::Cn => "https://openapi.tuyacn.com",
            Region::In => "https://openapi.tuyain.com",
        }
    }
}

impl FromStr for Region {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "eu" => Ok(Region::Eu),
            "us" => Ok(Region::Us),
            "cn" => Ok(Region::Cn),
            "in" => Ok(Region::In),
            other => Err(ConfigError::Invalid(format!(
                "Unknown region {:?} (expected eu, us, cn, or in)",
                other
            ))),
        }
    }
}

/// Bridge configuration, loaded once at startup.
#[derive(Debug, Clone, Validate)]
pub struct Config {
    /// Vendor access id (client_id header)
    pub access_id: String,
    /// Vendor access key (HMAC signing key)
    pub access_key: String,
    /// Scale device id
    pub device_id: String,
    pub region: Region,
    /// Seconds between scheduled refresh cycles
    #[validate(range(min = 60))]
    pub poll_interval_secs: u64,
    /// Emit an operator notification when a cycle degrades to cached data
    pub notify_on_error: bool,
    /// HTTP surface port
    pub port: u16,
    /// Household members registered on the scale
    #[validate(length(min = 1))]
    pub users: Vec<RegisteredUser>,
}

impl Config {
    /// Load configuration from environment variables (.env supported).
    ///
    /// Registered users come from `SCALE_USERS` (inline JSON array) or
    /// `SCALE_USERS_FILE` (path to a JSON file).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let config = Self {
            access_id: env::var("TUYA_ACCESS_ID")
                .map_err(|_| ConfigError::Missing("TUYA_ACCESS_ID"))?,
            access_key: env::var("TUYA_ACCESS_KEY")
                .map_err(|_| ConfigError::Missing("TUYA_ACCESS_KEY"))?,
            device_id: env::var("TUYA_DEVICE_ID")
                .map_err(|_| ConfigError::Missing("TUYA_DEVICE_ID"))?,
            region: env::var("TUYA_REGION")
                .map_err(|_| ConfigError::Missing("TUYA_REGION"))?
                .parse()?,
            poll_interval_secs: env::var("POLL_INTERVAL_SECS")
                .ok()
                .map(|v| {
                    v.parse()
                        .map_err(|_| ConfigError::Invalid(format!("Bad POLL_INTERVAL_SECS: {}", v)))
                })
                .transpose()?
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
            notify_on_error: env::var("NOTIFY_ON_ERROR")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            port: env::var("PORT")
                .ok()
                .map(|v| {
                    v.parse()
                        .map_err(|_| ConfigError::Invalid(format!("Bad PORT: {}", v)))
                })
                .transpose()?
                .unwrap_or(8080),
            users: load_users()?,
        };

        config
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(config)
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            access_id: "test_access_id".to_string(),
            access_key: "test_access_key".to_string(),
            device_id: "test_device".to_string(),
            region: Region::Eu,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            notify_on_error: true,
            port: 8080,
            users: Vec::new(),
        }
    }
}

/// Parse the registered-user list from env.
fn load_users() -> Result<Vec<RegisteredUser>, ConfigError> {
    let json = if let Ok(inline) = env::var("SCALE_USERS") {
        inline
    } else if let Ok(path) = env::var("SCALE_USERS_FILE") {
        std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Invalid(format!("Reading {}: {}", path, e)))?
    } else {
        return Err(ConfigError::Missing("SCALE_USERS"));
    };

    serde_json::from_str(&json).map_err(|e| ConfigError::Invalid(format!("Bad user list: {}", e)))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
