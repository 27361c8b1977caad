use {
    crate::domain::{error::LifecycleError, notify::Notifier, provider::BoxFuture},
    std::time::Duration,
};

/// Posts `{"text": message}` to a chat-style incoming webhook.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, LifecycleError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LifecycleError::Notification(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl Notifier for WebhookNotifier {
    fn deliver<'a>(&'a self, message: &'a str) -> BoxFuture<'a, Result<(), LifecycleError>> {
        Box::pin(async move {
            let resp = self
                .client
                .post(&self.url)
                .json(&serde_json::json!({ "text": message }))
                .send()
                .await
                .map_err(|e| LifecycleError::Notification(e.to_string()))?;

            if !resp.status().is_success() {
                return Err(LifecycleError::Notification(format!(
                    "webhook responded with HTTP {}",
                    resp.status()
                )));
            }
            Ok(())
        })
    }
}

/// Used when no webhook is configured: messages only reach the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn deliver<'a>(&'a self, message: &'a str) -> BoxFuture<'a, Result<(), LifecycleError>> {
        Box::pin(async move {
            tracing::info!(target: "pay_sync::notifications", %message, "notification");
            Ok(())
        })
    }
}
