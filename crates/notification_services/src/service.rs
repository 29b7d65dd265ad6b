use reqwest::Client;
use validator::Validate;

use crate::types::*;

/// Client for the Pushsafer push-notification API.
#[derive(Debug, Clone)]
pub struct PushsaferClient {
    client: Client,
    config: PushsaferConfig,
}

impl PushsaferClient {
    /// Creates a client after checking the notification settings.
    pub fn new(config: PushsaferConfig) -> Result<Self, NotificationError> {
        config
            .validate()
            .map_err(|e| NotificationError::Validation(e.to_string()))?;

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { client, config })
    }

    /// Sends a push notification.
    ///
    /// A returned status that is not a success is not an error here; the
    /// caller decides how to report it.
    pub async fn notify(
        &self,
        api_key: &str,
        message: &PushMessage,
    ) -> Result<PushsaferStatus, NotificationError> {
        let mut fields: Vec<(&str, String)> = vec![
            ("d", self.config.device.clone()),
            ("t", self.config.title.clone()),
            ("m", message.text.clone()),
            ("s", self.config.sound.to_string()),
            ("v", self.config.vibration.to_string()),
            ("i", self.config.icon.to_string()),
            ("c", self.config.color.clone()),
            ("k", api_key.to_string()),
        ];

        if let Some(priority) = self.config.priority {
            fields.push(("pr", priority.to_string()));
        }

        if let Some(ref url) = message.url {
            fields.push(("u", url.clone()));
            fields.push((
                "ut",
                message
                    .url_title
                    .clone()
                    .unwrap_or_else(|| "Campsite Page".to_string()),
            ));
        }

        log::info!("📱 Sending Pushsafer notification to device {}", self.config.device);
        log::debug!("📱 Message: {}", message.text);

        self.post("api", &fields).await
    }

    /// Checks a username and key against Pushsafer.
    pub async fn validate_key(&self, credentials: &Credentials) -> Result<bool, NotificationError> {
        let fields = [
            ("u", credentials.username.clone()),
            ("k", credentials.api_key.clone()),
        ];

        let status = self.post("api-k", &fields).await?;
        if status.is_success() {
            log::info!("✅ Pushsafer credentials valid for {}", credentials.username);
        } else {
            log::warn!("❌ Pushsafer rejected credentials: {}", status);
        }

        Ok(status.is_success())
    }

    async fn post(
        &self,
        endpoint: &str,
        fields: &[(&str, String)],
    ) -> Result<PushsaferStatus, NotificationError> {
        let url = format!("{}/{}", self.config.api_url.trim_end_matches('/'), endpoint);

        let response = self.client.post(&url).form(fields).send().await?;

        let status = response.status();
        if !status.is_success() {
            log::error!("❌ Pushsafer returned HTTP {}", status);
            return Err(NotificationError::UnexpectedStatus(status.as_u16()));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}
