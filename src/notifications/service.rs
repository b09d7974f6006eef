use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use super::models::{AlertPayload, ChannelConfig};
use super::senders::{resend::ResendSender, webhook::WebhookSender, NotificationSender, SenderError};
use super::templates;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Sender error: {0}")]
    SenderError(#[from] SenderError),
    #[error("Templating error: {0}")]
    TemplatingError(#[from] tera::Error),
    #[error("Alert has no recipients")]
    NoRecipients,
}

/// Renders and delivers alerts.
///
/// The uptime pipeline depends on this trait only, so tests can substitute a
/// recording or failing implementation.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, payload: &AlertPayload) -> Result<(), NotificationError>;
}

pub struct NotificationService {
    email: Box<dyn NotificationSender>,
    webhook: Box<dyn NotificationSender>,
}

impl NotificationService {
    pub fn new(email: ResendSender, webhook: WebhookSender) -> Self {
        Self::with_senders(Box::new(email), Box::new(webhook))
    }

    pub fn with_senders(
        email: Box<dyn NotificationSender>,
        webhook: Box<dyn NotificationSender>,
    ) -> Self {
        Self { email, webhook }
    }
}

#[async_trait]
impl NotificationDispatcher for NotificationService {
    /// Emails every recipient, then mirrors the alert to the webhook if one is set.
    ///
    /// Succeeds when at least one email was accepted. Webhook failures are
    /// logged and never change the result.
    async fn dispatch(&self, payload: &AlertPayload) -> Result<(), NotificationError> {
        if payload.recipients.is_empty() {
            return Err(NotificationError::NoRecipients);
        }
        let context = payload.template_context();
        let message = templates::render_alert(payload.kind, &payload.templates, &context)?;

        let mut delivered = 0usize;
        let mut last_error = None;
        for recipient in &payload.recipients {
            let config = ChannelConfig::Email {
                to: recipient.clone(),
            };
            match self.email.send(&config, &message, &context).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(
                        target_id = payload.target_id,
                        recipient = %recipient,
                        error = %e,
                        "Failed to email alert recipient."
                    );
                    last_error = Some(e);
                }
            }
        }

        if let Some(url) = payload.webhook_url.as_deref() {
            if let Err(e) = self
                .webhook
                .send(&ChannelConfig::webhook(url), &message, &context)
                .await
            {
                warn!(target_id = payload.target_id, error = %e, "Failed to deliver alert webhook.");
            }
        }

        match last_error {
            Some(e) if delivered == 0 => Err(e.into()),
            _ => {
                info!(
                    target_id = payload.target_id,
                    kind = payload.kind.as_str(),
                    delivered,
                    "Alert dispatched."
                );
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::AlertTemplateOverrides;
    use crate::notifications::models::{AlertKind, RenderedMessage};
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder {
        sent: Arc<Mutex<Vec<(ChannelConfig, String)>>>,
        fail_for: Option<String>,
    }

    #[async_trait]
    impl NotificationSender for Recorder {
        async fn send(
            &self,
            config: &ChannelConfig,
            message: &RenderedMessage,
            _context: &HashMap<String, String>,
        ) -> Result<(), SenderError> {
            if let (Some(bad), ChannelConfig::Email { to }) = (&self.fail_for, config) {
                if to == bad {
                    return Err(SenderError::SendFailed("mailbox unavailable".into()));
                }
            }
            self.sent
                .lock()
                .unwrap()
                .push((config.clone(), message.subject.clone()));
            Ok(())
        }
    }

    fn payload(recipients: &[&str], webhook: Option<&str>) -> AlertPayload {
        AlertPayload {
            kind: AlertKind::Down,
            target_id: 4,
            recipients: recipients.iter().map(|r| r.to_string()).collect(),
            recipient_name: Some("Ada".into()),
            service_name: "Blog".into(),
            target_label: "home".into(),
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            status_code: Some(500),
            error_message: None,
            response_time_ms: Some(40),
            downtime_seconds: Some(0),
            templates: AlertTemplateOverrides::default(),
            webhook_url: webhook.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn emails_every_recipient_and_webhook() {
        let email = Recorder::default();
        let hook = Recorder::default();
        let service =
            NotificationService::with_senders(Box::new(email.clone()), Box::new(hook.clone()));

        service
            .dispatch(&payload(&["a@example.com", "b@example.com"], Some("https://hook.example")))
            .await
            .unwrap();

        let sent = email.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].1, "🔴 Service Down: Blog - home");
        assert_eq!(hook.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn partial_delivery_counts_as_success() {
        let email = Recorder {
            fail_for: Some("b@example.com".into()),
            ..Default::default()
        };
        let service =
            NotificationService::with_senders(Box::new(email.clone()), Box::new(Recorder::default()));
        service
            .dispatch(&payload(&["a@example.com", "b@example.com"], None))
            .await
            .unwrap();
        assert_eq!(email.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn total_failure_is_reported() {
        let email = Recorder {
            fail_for: Some("a@example.com".into()),
            ..Default::default()
        };
        let service =
            NotificationService::with_senders(Box::new(email), Box::new(Recorder::default()));
        let result = service.dispatch(&payload(&["a@example.com"], None)).await;
        assert!(matches!(result, Err(NotificationError::SenderError(_))));

        let result = service.dispatch(&payload(&[], None)).await;
        assert!(matches!(result, Err(NotificationError::NoRecipients)));
    }
}
