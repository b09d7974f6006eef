//! Alert subject/body templates.
//!
//! Templates use Tera syntax. Variables: `serviceName`, `urlLabel`,
//! `timestamp`, `statusCode`, `errorMessage`, `responseTime`,
//! `downtimeDuration`, `recipientName` and `alertType`. All of them are always
//! defined; unknown values are empty strings, so `{% if statusCode %}` works.

use chrono::Duration;
use std::collections::HashMap;
use tera::{Context, Tera};
use tracing::warn;

use super::models::{AlertKind, RenderedMessage};
use crate::db::models::AlertTemplateOverrides;

pub const DEFAULT_DOWN_SUBJECT: &str = "🔴 Service Down: {{ serviceName }} - {{ urlLabel }}";
pub const DEFAULT_RECOVERY_SUBJECT: &str =
    "✅ Service Recovered: {{ serviceName }} - {{ urlLabel }}";
pub const DEFAULT_SLOW_SUBJECT: &str = "🐢 Slow Response: {{ serviceName }} - {{ urlLabel }}";

pub const DEFAULT_DOWN_BODY: &str = r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #c0392b;">🚨 Service Down Alert</h2>
  <p>Hello {{ recipientName }},</p>
  <p>Your service <strong>{{ serviceName }}</strong> ({{ urlLabel }}) is currently down.</p>

  <div style="background: #f8f9fa; padding: 15px; border-radius: 8px; margin: 20px 0;">
    <p><strong>Service:</strong> {{ serviceName }}</p>
    <p><strong>URL:</strong> {{ urlLabel }}</p>
    <p><strong>Time:</strong> {{ timestamp }}</p>
    {% if statusCode %}<p><strong>Status Code:</strong> {{ statusCode }}</p>{% endif %}
    {% if errorMessage %}<p><strong>Error:</strong> {{ errorMessage }}</p>{% endif %}
    {% if downtimeDuration %}<p><strong>Down for:</strong> {{ downtimeDuration }}</p>{% endif %}
  </div>

  <p>Please check your service as soon as possible.</p>
  <p style="color: #6c757d; font-size: 12px;">This is an automated alert from SelfHost Monitor.</p>
</div>"#;

pub const DEFAULT_RECOVERY_BODY: &str = r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #27ae60;">✅ Service Recovered</h2>
  <p>Hello {{ recipientName }},</p>
  <p>Great news! Your service <strong>{{ serviceName }}</strong> ({{ urlLabel }}) is back online.</p>

  <div style="background: #f8f9fa; padding: 15px; border-radius: 8px; margin: 20px 0;">
    <p><strong>Service:</strong> {{ serviceName }}</p>
    <p><strong>URL:</strong> {{ urlLabel }}</p>
    <p><strong>Recovery Time:</strong> {{ timestamp }}</p>
    {% if responseTime %}<p><strong>Response Time:</strong> {{ responseTime }}ms</p>{% endif %}
    {% if downtimeDuration %}<p><strong>Total Downtime:</strong> {{ downtimeDuration }}</p>{% endif %}
  </div>

  <p>Your service is now operational.</p>
  <p style="color: #6c757d; font-size: 12px;">This is an automated alert from SelfHost Monitor.</p>
</div>"#;

pub const DEFAULT_SLOW_BODY: &str = r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #e67e22;">🐢 Slow Response</h2>
  <p>Hello {{ recipientName }},</p>
  <p>Your service <strong>{{ serviceName }}</strong> ({{ urlLabel }}) is responding slowly.</p>

  <div style="background: #f8f9fa; padding: 15px; border-radius: 8px; margin: 20px 0;">
    <p><strong>Response Time:</strong> {{ responseTime }}ms</p>
    <p><strong>Time:</strong> {{ timestamp }}</p>
  </div>

  <p style="color: #6c757d; font-size: 12px;">This is an automated alert from SelfHost Monitor.</p>
</div>"#;

pub fn render(
    template: &str,
    context: &HashMap<String, String>,
    autoescape: bool,
) -> Result<String, tera::Error> {
    let mut tera_context = Context::new();
    for (key, value) in context {
        tera_context.insert(key, value);
    }
    Tera::one_off(template, &tera_context, autoescape)
}

fn render_or_default(
    custom: Option<&str>,
    default: &str,
    context: &HashMap<String, String>,
    autoescape: bool,
) -> Result<String, tera::Error> {
    if let Some(custom) = custom.filter(|t| !t.trim().is_empty()) {
        match render(custom, context, autoescape) {
            Ok(rendered) => return Ok(rendered),
            Err(e) => warn!(error = %e, "Custom alert template failed to render. Using the default."),
        }
    }
    render(default, context, autoescape)
}

/// Renders the subject and HTML body of an alert.
pub fn render_alert(
    kind: AlertKind,
    overrides: &AlertTemplateOverrides,
    context: &HashMap<String, String>,
) -> Result<RenderedMessage, tera::Error> {
    let (subject, body, default_subject, default_body) = match kind {
        AlertKind::Down => (
            overrides.down_subject.as_deref(),
            overrides.down_body.as_deref(),
            DEFAULT_DOWN_SUBJECT,
            DEFAULT_DOWN_BODY,
        ),
        AlertKind::Recovery => (
            overrides.recovery_subject.as_deref(),
            overrides.recovery_body.as_deref(),
            DEFAULT_RECOVERY_SUBJECT,
            DEFAULT_RECOVERY_BODY,
        ),
        AlertKind::SlowResponse => (None, None, DEFAULT_SLOW_SUBJECT, DEFAULT_SLOW_BODY),
    };

    Ok(RenderedMessage {
        subject: render_or_default(subject, default_subject, context, false)?,
        html: render_or_default(body, default_body, context, true)?,
    })
}

/// `Xd Yh Zm`, `Xh Ym`, `Xm Ys` or `Xs`. Negative durations count as zero.
pub fn format_duration(duration: Duration) -> String {
    let seconds = duration.num_seconds().max(0);
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{}d {}h {}m", days, hours % 24, minutes % 60)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> HashMap<String, String> {
        [
            ("alertType", "down"),
            ("serviceName", "Blog & Co"),
            ("urlLabel", "home"),
            ("timestamp", "2024-05-01 12:30:00 UTC"),
            ("statusCode", "502"),
            ("errorMessage", ""),
            ("responseTime", ""),
            ("downtimeDuration", "5m 0s"),
            ("recipientName", "Ada"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn durations_use_the_largest_units() {
        assert_eq!(format_duration(Duration::seconds(42)), "42s");
        assert_eq!(format_duration(Duration::seconds(125)), "2m 5s");
        assert_eq!(format_duration(Duration::seconds(3 * 3600 + 7 * 60 + 9)), "3h 7m");
        assert_eq!(format_duration(Duration::seconds(2 * 86400 + 5 * 3600 + 60)), "2d 5h 1m");
        assert_eq!(format_duration(Duration::seconds(-10)), "0s");
    }

    #[test]
    fn default_down_alert_renders() {
        let message = render_alert(AlertKind::Down, &AlertTemplateOverrides::default(), &context())
            .unwrap();
        // Subjects are not HTML-escaped; bodies are.
        assert_eq!(message.subject, "🔴 Service Down: Blog & Co - home");
        assert!(message.html.contains("Blog &amp; Co"));
        assert!(message.html.contains("Status Code:</strong> 502"));
        assert!(!message.html.contains("Error:"));
        assert!(message.html.contains("Hello Ada"));
    }

    #[test]
    fn custom_templates_take_precedence() {
        let overrides = AlertTemplateOverrides {
            recovery_subject: Some("{{ urlLabel }} is back".into()),
            ..Default::default()
        };
        let message = render_alert(AlertKind::Recovery, &overrides, &context()).unwrap();
        assert_eq!(message.subject, "home is back");
        assert!(message.html.contains("Total Downtime:</strong> 5m 0s"));
    }

    #[test]
    fn broken_custom_template_falls_back_to_default() {
        let overrides = AlertTemplateOverrides {
            down_subject: Some("{{#if statusCode}}bad{{/if}}".into()),
            down_body: Some("{% if %}".into()),
            ..Default::default()
        };
        let message = render_alert(AlertKind::Down, &overrides, &context()).unwrap();
        assert_eq!(message.subject, "🔴 Service Down: Blog & Co - home");
        assert!(message.html.contains("Service Down Alert"));
    }
}
