use std::sync::Arc;

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use shared_config::AppConfig;

/// Plain-text email delivery through an HTTP relay. Delivery is
/// best-effort: scheduling requests must never fail because a
/// notification could not be sent.
pub struct NotificationService {
    client: Client,
    relay_url: String,
    from_email: String,
}

impl NotificationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            relay_url: config.notify_relay_url.clone(),
            from_email: config.notify_from_email.clone(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.relay_url.is_empty()
    }

    pub async fn send_plain(&self, to_email: &str, subject: &str, body: &str) -> Result<()> {
        if !self.is_enabled() {
            debug!("Notification relay not configured, dropping message to {}", to_email);
            return Ok(());
        }

        let message = json!({
            "from": self.from_email,
            "to": to_email,
            "subject": subject,
            "text": body,
        });

        let response = self
            .client
            .post(&self.relay_url)
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Relay error ({}): {}", status, error_text));
        }

        debug!("Notification sent to {}", to_email);
        Ok(())
    }

    /// Fire-and-forget variant: spawns the send and logs failures instead
    /// of surfacing them to the caller.
    pub fn send_detached(self: &Arc<Self>, to_email: String, subject: String, body: String) {
        let mailer = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = mailer.send_plain(&to_email, &subject, &body).await {
                warn!("Failed to send notification to {}: {}", to_email, e);
            }
        });
    }
}
