//! Domain models shared by the storage layer and the uptime engine.
//!
//! These are plain structs decoupled from any particular database: the
//! SeaORM entities in [`crate::db::entities`] convert into them, and the
//! in-memory store keeps them directly.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = i32;
pub type ServiceId = i32;
pub type TargetId = i32;

/// Optional subject/body overrides for down and recovery alerts.
///
/// Bodies and subjects are Tera templates; see
/// [`crate::notifications::templates`] for the available variables.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertTemplateOverrides {
    pub down_subject: Option<String>,
    pub down_body: Option<String>,
    pub recovery_subject: Option<String>,
    pub recovery_body: Option<String>,
}

impl AlertTemplateOverrides {
    pub fn is_empty(&self) -> bool {
        self.down_subject.is_none()
            && self.down_body.is_none()
            && self.recovery_subject.is_none()
            && self.recovery_body.is_none()
    }

    /// Fills every unset field from `fallback`.
    pub fn or(self, fallback: &AlertTemplateOverrides) -> AlertTemplateOverrides {
        AlertTemplateOverrides {
            down_subject: self.down_subject.or_else(|| fallback.down_subject.clone()),
            down_body: self.down_body.or_else(|| fallback.down_body.clone()),
            recovery_subject: self
                .recovery_subject
                .or_else(|| fallback.recovery_subject.clone()),
            recovery_body: self.recovery_body.or_else(|| fallback.recovery_body.clone()),
        }
    }
}

/// Runtime bookkeeping carried on a monitored target.
///
/// Only the target's own pipeline mutates these fields.
/// `current_failure_count == 0` exactly when `first_failure_at` is `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetRuntimeState {
    /// Last time a probe started, whether or not its result was persisted.
    pub last_check_at: Option<DateTime<Utc>>,
    /// Last time a history row was written.
    pub last_save_at: Option<DateTime<Utc>>,
    /// Outcome of the most recent probe, independent of persistence.
    pub last_probe_up: Option<bool>,
    pub current_failure_count: u32,
    pub first_failure_at: Option<DateTime<Utc>>,
    pub last_alert_at: Option<DateTime<Utc>>,
}

/// A URL under monitoring.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoredTarget {
    pub id: TargetId,
    /// `None` for orphaned rows; those are never probed.
    pub user_id: Option<UserId>,
    pub service_id: ServiceId,
    pub label: String,
    /// Stored address, possibly encrypted at rest.
    pub url: String,
    pub ping_interval_seconds: Option<i32>,
    pub save_interval_minutes: Option<i32>,
    pub exclude_from_uptime: bool,

    pub email_alerts_enabled: bool,
    pub notify_on_down: bool,
    pub notify_on_recovery: bool,
    pub min_downtime_seconds: Option<i32>,
    pub consecutive_failures: Option<i32>,
    pub alert_cooldown_minutes: Option<i32>,
    pub alert_on_slow_response: bool,
    pub slow_response_threshold_ms: Option<i32>,
    pub alert_on_status_codes: Vec<u16>,
    pub ignore_status_codes: Vec<u16>,
    pub additional_emails: Vec<String>,
    pub use_custom_alerts: bool,
    pub custom_templates: AlertTemplateOverrides,

    pub state: TargetRuntimeState,
}

impl MonitoredTarget {
    /// A target with default alert settings and no runtime history.
    pub fn new(user_id: UserId, service_id: ServiceId, label: &str, url: &str) -> Self {
        Self {
            id: 0,
            user_id: Some(user_id),
            service_id,
            label: label.to_owned(),
            url: url.to_owned(),
            ping_interval_seconds: None,
            save_interval_minutes: None,
            exclude_from_uptime: false,
            email_alerts_enabled: false,
            notify_on_down: true,
            notify_on_recovery: true,
            min_downtime_seconds: None,
            consecutive_failures: None,
            alert_cooldown_minutes: None,
            alert_on_slow_response: false,
            slow_response_threshold_ms: None,
            alert_on_status_codes: Vec::new(),
            ignore_status_codes: Vec::new(),
            additional_emails: Vec::new(),
            use_custom_alerts: false,
            custom_templates: AlertTemplateOverrides::default(),
            state: TargetRuntimeState::default(),
        }
    }

    /// Probe interval, falling back to `default_interval` when unset or not positive.
    pub fn ping_interval(&self, default_interval: Duration) -> Duration {
        match self.ping_interval_seconds {
            Some(secs) if secs > 0 => Duration::seconds(i64::from(secs)),
            _ => default_interval,
        }
    }

    /// Whether the probe interval has elapsed since the last probe started.
    ///
    /// Excluded targets are never due; a target that was never probed is.
    pub fn is_due(&self, now: DateTime<Utc>, default_interval: Duration) -> bool {
        if self.exclude_from_uptime {
            return false;
        }
        match self.state.last_check_at {
            None => true,
            Some(last) => now - last >= self.ping_interval(default_interval),
        }
    }
}

/// Consecutive-failure bookkeeping, always written as a pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureState {
    pub current_failure_count: u32,
    pub first_failure_at: Option<DateTime<Utc>>,
}

/// A partial update of a target's runtime fields. `None` leaves a field as is.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TargetPatch {
    pub last_check_at: Option<DateTime<Utc>>,
    pub last_save_at: Option<DateTime<Utc>>,
    pub last_probe_up: Option<bool>,
    pub failure: Option<FailureState>,
    pub last_alert_at: Option<DateTime<Utc>>,
}

impl TargetPatch {
    pub fn is_empty(&self) -> bool {
        *self == TargetPatch::default()
    }

    /// Applies the patch to an in-memory runtime state.
    pub fn apply_to(&self, state: &mut TargetRuntimeState) {
        if let Some(at) = self.last_check_at {
            state.last_check_at = Some(at);
        }
        if let Some(at) = self.last_save_at {
            state.last_save_at = Some(at);
        }
        if let Some(up) = self.last_probe_up {
            state.last_probe_up = Some(up);
        }
        if let Some(failure) = self.failure {
            state.current_failure_count = failure.current_failure_count;
            state.first_failure_at = failure.first_failure_at;
        }
        if let Some(at) = self.last_alert_at {
            state.last_alert_at = Some(at);
        }
    }
}

/// One immutable history row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub id: i64,
    pub target_id: TargetId,
    pub user_id: Option<UserId>,
    pub timestamp: DateTime<Utc>,
    pub is_up: bool,
    pub response_time_ms: Option<i64>,
    pub status_code: Option<u16>,
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewCheckResult {
    pub target_id: TargetId,
    pub user_id: Option<UserId>,
    pub timestamp: DateTime<Utc>,
    pub is_up: bool,
    pub response_time_ms: Option<i64>,
    pub status_code: Option<u16>,
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: Option<String>,
    pub email: Option<String>,
    pub notification_email: Option<String>,
    pub email_notifications_enabled: bool,
}

impl User {
    /// The address alerts go to, if the user opted in and configured one.
    pub fn alert_address(&self) -> Option<&str> {
        if !self.email_notifications_enabled {
            return None;
        }
        self.notification_email
            .as_deref()
            .map(str::trim)
            .filter(|addr| !addr.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: ServiceId,
    pub user_id: Option<UserId>,
    pub name: String,
    pub use_custom_alerts: bool,
    pub custom_templates: AlertTemplateOverrides,
}

/// Per-user alert defaults and channel settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertSettings {
    pub user_id: UserId,
    pub default_min_downtime_seconds: Option<i32>,
    pub default_consecutive_failures: Option<i32>,
    pub default_alert_cooldown_minutes: Option<i32>,
    pub send_recovery_alerts: bool,
    pub templates: AlertTemplateOverrides,
    pub enable_webhooks: bool,
    pub webhook_url: Option<String>,
}

impl AlertSettings {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            send_recovery_alerts: true,
            ..Default::default()
        }
    }

    /// The webhook to mirror alerts to, when enabled and non-empty.
    pub fn active_webhook(&self) -> Option<&str> {
        if !self.enable_webhooks {
            return None;
        }
        self.webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}
