use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use validator::Validate;

/// Errors from the push-notification service and credential storage.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// The request to Pushsafer could not be made.
    #[error("Pushsafer request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Pushsafer answered with a non-success HTTP status.
    #[error("Pushsafer returned HTTP {0}")]
    UnexpectedStatus(u16),

    /// The Pushsafer response body was not JSON.
    #[error("Failed to parse Pushsafer response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Reading or writing the credential file failed.
    #[error("Credential file error: {0}")]
    Io(#[from] std::io::Error),

    /// The credential file does not hold a username and key.
    #[error("Malformed credential file: {0}")]
    MalformedCredentials(String),

    /// Notification settings are out of range.
    #[error("Invalid notification settings: {0}")]
    Validation(String),
}

/// Pushsafer username and private key.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Pushsafer username or email
    pub username: String,
    /// Pushsafer private or alias key
    pub api_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Fixed parameters attached to every Pushsafer message.
#[derive(Debug, Clone, Validate)]
pub struct PushsaferConfig {
    /// Base URL of the Pushsafer service
    pub api_url: String,

    /// Target device or group id; "a" sends to all devices
    #[validate(length(min = 1, message = "Device is required"))]
    pub device: String,

    /// Notification title
    pub title: String,

    /// Sound id
    pub sound: u8,

    /// Vibration pattern (1-3)
    #[validate(range(min = 1, max = 3, message = "Vibration must be between 1 and 3"))]
    pub vibration: u8,

    /// Icon id
    pub icon: u16,

    /// Icon color
    pub color: String,

    /// Message priority, -2 (lowest) to 2 (highest)
    #[validate(range(min = -2, max = 2, message = "Priority must be between -2 and 2"))]
    pub priority: Option<i8>,

    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for PushsaferConfig {
    fn default() -> Self {
        Self {
            api_url: "https://www.pushsafer.com".to_string(),
            device: "a".to_string(),
            title: "Campsite Availability Update".to_string(),
            sound: 11,
            vibration: 3,
            icon: 33,
            color: "#FF0000".to_string(),
            priority: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Body of a push notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushMessage {
    /// Message text
    pub text: String,
    /// Optional link shown with the message
    pub url: Option<String>,
    /// Title for the link
    pub url_title: Option<String>,
}

impl PushMessage {
    /// A plain text message without a link.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Pushsafer's JSON answer: `status` 1 means success.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushsaferStatus {
    /// Numeric status, sometimes sent as a string
    #[serde(default)]
    pub status: Option<serde_json::Value>,
    /// Success description
    #[serde(default)]
    pub success: Option<String>,
    /// Error description
    #[serde(default)]
    pub error: Option<String>,
}

impl PushsaferStatus {
    /// The numeric status, if present.
    pub fn code(&self) -> Option<i64> {
        match self.status.as_ref()? {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// `status == 1`; a zero or missing status is a failure.
    pub fn is_success(&self) -> bool {
        self.code() == Some(1)
    }
}

impl fmt::Display for PushsaferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code(), &self.success, &self.error) {
            (Some(code), Some(success), _) => write!(f, "status {}: {}", code, success),
            (Some(code), None, Some(error)) => write!(f, "status {}: {}", code, error),
            (Some(code), None, None) => write!(f, "status {}", code),
            (None, _, Some(error)) => write!(f, "no status: {}", error),
            (None, _, None) => write!(f, "no status"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let ok: PushsaferStatus = serde_json::from_str(r#"{"status":1,"success":"message transmitted"}"#).unwrap();
        assert!(ok.is_success());

        let as_string: PushsaferStatus = serde_json::from_str(r#"{"status":"1"}"#).unwrap();
        assert!(as_string.is_success());

        let rejected: PushsaferStatus = serde_json::from_str(r#"{"status":0,"error":"invalid key"}"#).unwrap();
        assert!(!rejected.is_success());
        assert_eq!(rejected.to_string(), "status 0: invalid key");

        let missing: PushsaferStatus = serde_json::from_str("{}").unwrap();
        assert!(!missing.is_success());
    }

    #[test]
    fn test_priority_range() {
        let config = PushsaferConfig {
            priority: Some(3),
            ..PushsaferConfig::default()
        };
        assert!(config.validate().is_err());

        let config = PushsaferConfig {
            priority: Some(-2),
            ..PushsaferConfig::default()
        };
        assert!(config.validate().is_ok());
        assert!(PushsaferConfig::default().validate().is_ok());
    }

    #[test]
    fn test_credentials_debug_hides_key() {
        let credentials = Credentials {
            username: "camper@example.com".to_string(),
            api_key: "secret-key".to_string(),
        };
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("camper@example.com"));
        assert!(!debug.contains("secret-key"));
    }
}
