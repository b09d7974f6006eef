use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use super::{NotificationSender, SenderError};
use crate::notifications::models::{ChannelConfig, RenderedMessage};

pub const DEFAULT_RESEND_API_URL: &str = "https://api.resend.com";

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

/// Sends email through the Resend HTTP API.
pub struct ResendSender {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    from: String,
}

impl ResendSender {
    pub fn new(client: Client, api_url: &str, api_key: Option<String>, from: &str) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            from: from.to_string(),
        }
    }
}

#[async_trait]
impl NotificationSender for ResendSender {
    async fn send(
        &self,
        config: &ChannelConfig,
        message: &RenderedMessage,
        _context: &HashMap<String, String>,
    ) -> Result<(), SenderError> {
        let ChannelConfig::Email { to } = config else {
            return Err(SenderError::InvalidConfiguration(
                "Expected Email config, but found a different type.".to_string(),
            ));
        };
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(SenderError::InvalidConfiguration(
                "Email API key not configured".to_string(),
            ));
        };

        let body = SendEmailRequest {
            from: &self.from,
            to: [to.as_str()],
            subject: &message.subject,
            html: &message.html,
        };
        let response = self
            .client
            .post(format!("{}/emails", self.api_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(SenderError::SendFailed(format!(
                "Email API returned non-success status: {status}. Body: {error_body}"
            )));
        }
        debug!(recipient = %to, "Alert email accepted by the email API.");
        Ok(())
    }
}
