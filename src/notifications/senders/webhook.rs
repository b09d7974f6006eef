use async_trait::async_trait;
use reqwest::{header, Client};
use std::collections::HashMap;

use super::{NotificationSender, SenderError};
use crate::notifications::models::{ChannelConfig, RenderedMessage};

/// A sender for mirroring alerts to a user-configured webhook.
pub struct WebhookSender {
    client: Client,
}

impl WebhookSender {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn default_body(
    message: &RenderedMessage,
    context: &HashMap<String, String>,
) -> Result<String, SenderError> {
    let mut body = serde_json::Map::new();
    for (key, value) in context {
        body.insert(key.clone(), serde_json::Value::String(value.clone()));
    }
    body.insert(
        "subject".to_string(),
        serde_json::Value::String(message.subject.clone()),
    );
    serde_json::to_string(&body).map_err(|e| SenderError::SendFailed(e.to_string()))
}

#[async_trait]
impl NotificationSender for WebhookSender {
    async fn send(
        &self,
        config: &ChannelConfig,
        message: &RenderedMessage,
        context: &HashMap<String, String>,
    ) -> Result<(), SenderError> {
        let ChannelConfig::Webhook { url } = config else {
            return Err(SenderError::InvalidConfiguration(
                "Expected Webhook config, but found a different type.".to_string(),
            ));
        };

        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(default_body(message, context)?)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(SenderError::SendFailed(format!(
                "Webhook returned non-success status: {status}. Body: {error_body}"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message() -> RenderedMessage {
        RenderedMessage {
            subject: "🔴 Service Down: Blog - home".into(),
            html: "<p>down</p>".into(),
        }
    }

    fn context() -> HashMap<String, String> {
        HashMap::from([
            ("serviceName".to_string(), "Blog".to_string()),
            ("alertType".to_string(), "down".to_string()),
        ])
    }

    #[tokio::test]
    async fn posts_alert_as_json_by_default() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header("content-type", "application/json"))
            .and(body_partial_json(serde_json::json!({
                "alertType": "down",
                "serviceName": "Blog",
                "subject": "🔴 Service Down: Blog - home",
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let config = ChannelConfig::webhook(&format!("{}/hook", server.uri()));
        WebhookSender::new(Client::new())
            .send(&config, &message(), &context())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = WebhookSender::new(Client::new())
            .send(&ChannelConfig::webhook(&server.uri()), &message(), &context())
            .await;
        assert!(matches!(result, Err(SenderError::SendFailed(_))));
    }

    #[tokio::test]
    async fn email_config_is_rejected() {
        let config = ChannelConfig::Email {
            to: "ops@example.com".into(),
        };
        let result = WebhookSender::new(Client::new())
            .send(&config, &message(), &context())
            .await;
        assert!(matches!(result, Err(SenderError::InvalidConfiguration(_))));
    }
}
