use notification_services::{Credentials, NotificationError, PushMessage, PushsaferClient, PushsaferStatus};
use tracing::debug;

use crate::executor::Notifier;

/// Delivers poll results through Pushsafer with a fixed private key
pub struct PushsaferNotifier {
    client: PushsaferClient,
    api_key: String,
}

impl PushsaferNotifier {
    /// Send through `client` with the key from `credentials`.
    pub fn new(client: PushsaferClient, credentials: &Credentials) -> Self {
        Self {
            client,
            api_key: credentials.api_key.clone(),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for PushsaferNotifier {
    async fn notify(&self, message: &PushMessage) -> Result<PushsaferStatus, NotificationError> {
        debug!("Pushing {} byte message", message.text.len());
        self.client.notify(&self.api_key, message).await
    }
}
