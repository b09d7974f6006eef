use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::db::models::{AlertTemplateOverrides, TargetId};

use super::templates::format_duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Down,
    Recovery,
    SlowResponse,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Down => "down",
            AlertKind::Recovery => "recovery",
            AlertKind::SlowResponse => "slow_response",
        }
    }
}

/// Everything needed to render and deliver one alert.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertPayload {
    pub kind: AlertKind,
    pub target_id: TargetId,
    /// Owner's notification address first, then the target's additional recipients.
    pub recipients: Vec<String>,
    pub recipient_name: Option<String>,
    pub service_name: String,
    pub target_label: String,
    pub timestamp: DateTime<Utc>,
    pub status_code: Option<u16>,
    pub error_message: Option<String>,
    pub response_time_ms: Option<u64>,
    /// Length of the current (down) or just-finished (recovery) outage.
    pub downtime_seconds: Option<i64>,
    /// Already resolved across target, service and user settings.
    pub templates: AlertTemplateOverrides,
    pub webhook_url: Option<String>,
}

impl AlertPayload {
    /// Template variables. Every key is always present; missing values are empty.
    pub fn template_context(&self) -> HashMap<String, String> {
        let mut context = HashMap::new();
        context.insert("alertType".to_string(), self.kind.as_str().to_string());
        context.insert("serviceName".to_string(), self.service_name.clone());
        context.insert("urlLabel".to_string(), self.target_label.clone());
        context.insert(
            "timestamp".to_string(),
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        );
        context.insert(
            "statusCode".to_string(),
            self.status_code.map(|c| c.to_string()).unwrap_or_default(),
        );
        context.insert(
            "errorMessage".to_string(),
            self.error_message.clone().unwrap_or_default(),
        );
        context.insert(
            "responseTime".to_string(),
            self.response_time_ms.map(|ms| ms.to_string()).unwrap_or_default(),
        );
        context.insert(
            "downtimeDuration".to_string(),
            self.downtime_seconds
                .map(|secs| format_duration(Duration::seconds(secs)))
                .unwrap_or_default(),
        );
        context.insert(
            "recipientName".to_string(),
            self.recipient_name
                .clone()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| "User".to_string()),
        );
        context
    }
}

/// Delivery configuration for one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChannelConfig {
    Email {
        to: String,
    },
    /// Receives the alert as a JSON document.
    Webhook {
        url: String,
    },
}

impl ChannelConfig {
    pub fn webhook(url: &str) -> Self {
        ChannelConfig::Webhook {
            url: url.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: String,
    pub html: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn context_has_every_key() {
        let payload = AlertPayload {
            kind: AlertKind::Down,
            target_id: 1,
            recipients: vec!["a@example.com".into()],
            recipient_name: None,
            service_name: "Blog".into(),
            target_label: "home".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
            status_code: Some(502),
            error_message: None,
            response_time_ms: None,
            downtime_seconds: Some(3_900),
            templates: AlertTemplateOverrides::default(),
            webhook_url: None,
        };
        let ctx = payload.template_context();
        assert_eq!(ctx["timestamp"], "2024-05-01 12:30:00 UTC");
        assert_eq!(ctx["statusCode"], "502");
        assert_eq!(ctx["errorMessage"], "");
        assert_eq!(ctx["responseTime"], "");
        assert_eq!(ctx["downtimeDuration"], "1h 5m");
        assert_eq!(ctx["recipientName"], "User");
        assert_eq!(ctx["alertType"], "down");
    }
}
