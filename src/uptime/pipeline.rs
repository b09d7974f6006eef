//! One target's probe pipeline: stamp, probe, persist, track, alert.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::alert_engine::{self, AlertDecision, AlertDefaults, AlertInput, AlertThresholds};
use super::persistence::{PersistencePolicy, SaveDecision, SaveInput};
use super::probe::{ProbeExecutor, ProbeOutcome};
use super::tracker::{self, FailureUpdate, Transition};
use crate::db::models::{
    AlertSettings, AlertTemplateOverrides, CheckResult, FailureState, MonitoredTarget,
    NewCheckResult, Service, TargetId, TargetPatch, User,
};
use crate::db::{StoreError, UptimeStore};
use crate::notifications::encryption::{resolve_stored_value, EncryptionService, StoredValue};
use crate::notifications::models::{AlertKind, AlertPayload};
use crate::notifications::NotificationDispatcher;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Server-wide defaults consumed by the pipeline and the scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineSettings {
    pub default_ping_interval: Duration,
    pub default_save_interval: Duration,
    pub alert_defaults: AlertDefaults,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_ping_interval: Duration::seconds(30),
            default_save_interval: Duration::minutes(10),
            alert_defaults: AlertDefaults::default(),
        }
    }
}

/// Owner data prefetched by the scheduler for one target.
#[derive(Clone, Debug)]
pub struct OwnerContext {
    pub user: User,
    pub service: Option<Service>,
    pub alert_settings: Option<AlertSettings>,
    /// Newest persisted history row of the target.
    pub previous_result: Option<CheckResult>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineReport {
    pub target_id: TargetId,
    pub outcome: ProbeOutcome,
    pub save: SaveDecision,
    pub transition: Transition,
    pub alert: AlertDecision,
    /// `None` when no alert fired.
    pub alert_delivered: Option<bool>,
}

/// Template overrides for a target: target custom, then service custom, then user settings.
pub fn resolve_templates(
    target: &MonitoredTarget,
    service: Option<&Service>,
    settings: Option<&AlertSettings>,
) -> AlertTemplateOverrides {
    let mut templates = if target.use_custom_alerts {
        target.custom_templates.clone()
    } else {
        AlertTemplateOverrides::default()
    };
    if let Some(service) = service.filter(|s| s.use_custom_alerts) {
        templates = templates.or(&service.custom_templates);
    }
    if let Some(settings) = settings {
        templates = templates.or(&settings.templates);
    }
    templates
}

/// Owner address first, then the target's additional recipients, without duplicates.
fn recipients(target: &MonitoredTarget, user: &User) -> Vec<String> {
    let mut list: Vec<String> = Vec::new();
    let extra = target.additional_emails.iter().map(|e| e.trim());
    for address in user.alert_address().into_iter().chain(extra) {
        if !address.is_empty() && !list.iter().any(|a| a.eq_ignore_ascii_case(address)) {
            list.push(address.to_string());
        }
    }
    list
}

pub struct TargetPipeline {
    store: Arc<dyn UptimeStore>,
    executor: ProbeExecutor,
    dispatcher: Arc<dyn NotificationDispatcher>,
    encryption: Option<Arc<EncryptionService>>,
    persistence: PersistencePolicy,
    alert_defaults: AlertDefaults,
}

impl TargetPipeline {
    pub fn new(
        store: Arc<dyn UptimeStore>,
        executor: ProbeExecutor,
        dispatcher: Arc<dyn NotificationDispatcher>,
        settings: &EngineSettings,
    ) -> Self {
        Self {
            store,
            executor,
            dispatcher,
            encryption: None,
            persistence: PersistencePolicy::new(settings.default_save_interval),
            alert_defaults: settings.alert_defaults,
        }
    }

    pub fn with_encryption(mut self, encryption: Arc<EncryptionService>) -> Self {
        self.encryption = Some(encryption);
        self
    }

    fn resolve_address(&self, target: &MonitoredTarget) -> String {
        match resolve_stored_value(&target.url, self.encryption.as_deref()) {
            None => String::new(),
            Some(StoredValue::Fallback { raw, error }) => {
                warn!(
                    target_id = target.id,
                    error = %error,
                    "Failed to decrypt stored address. Probing the stored value as-is."
                );
                raw
            }
            Some(value) => value.into_value(),
        }
    }

    /// Runs the full pipeline for one due target at tick time `now`.
    ///
    /// Storage failures abort this target's pipeline; dispatch failures are
    /// logged and only leave `last_alert_at` untouched.
    pub async fn run(
        &self,
        target: &MonitoredTarget,
        owner: &OwnerContext,
        now: DateTime<Utc>,
    ) -> Result<PipelineReport, PipelineError> {
        // Stamp first so an overlapping tick does not pick this target up again.
        self.store
            .patch_target(
                target.id,
                &TargetPatch {
                    last_check_at: Some(now),
                    ..Default::default()
                },
            )
            .await?;

        let address = self.resolve_address(target);
        let outcome = if address.is_empty() {
            ProbeOutcome::down(0, None, Some("Target has no address".to_string()))
        } else {
            self.executor.probe(&address).await
        };

        let prev_up = target
            .state
            .last_probe_up
            .or_else(|| owner.previous_result.as_ref().map(|r| r.is_up));

        let save = self.persistence.decide(&SaveInput {
            up: outcome.up,
            prev_up,
            last_save_at: target.state.last_save_at,
            previous_result_at: owner.previous_result.as_ref().map(|r| r.timestamp),
            save_interval_minutes: target.save_interval_minutes,
            now,
        });
        if save.should_save() {
            self.store
                .insert_check_result(NewCheckResult {
                    target_id: target.id,
                    user_id: target.user_id,
                    timestamp: now,
                    is_up: outcome.up,
                    response_time_ms: Some(i64::try_from(outcome.latency_ms).unwrap_or(i64::MAX)),
                    status_code: outcome.status_code,
                    error: outcome.error.clone(),
                })
                .await?;
        }
        debug!(target_id = target.id, up = outcome.up, decision = ?save, "Persistence decision.");

        let prior = FailureState {
            current_failure_count: target.state.current_failure_count,
            first_failure_at: target.state.first_failure_at,
        };
        let failure = tracker::advance(&prior, prev_up, outcome.up, now);

        let mut patch = TargetPatch {
            last_probe_up: Some(outcome.up),
            ..Default::default()
        };
        if save.should_save() {
            patch.last_save_at = Some(now);
        }
        if failure.changed_from(&prior) {
            patch.failure = Some(failure.state);
        }
        self.store.patch_target(target.id, &patch).await?;

        let thresholds = AlertThresholds::resolve(
            target,
            owner.alert_settings.as_ref(),
            &self.alert_defaults,
        );
        let alert = alert_engine::evaluate(&AlertInput {
            target,
            outcome: &outcome,
            prev_up,
            failure: &failure,
            last_alert_at: target.state.last_alert_at,
            thresholds: &thresholds,
            has_recipient: owner.user.alert_address().is_some(),
            send_recovery_alerts: owner
                .alert_settings
                .as_ref()
                .map_or(true, |s| s.send_recovery_alerts),
            now,
        });

        let alert_delivered = match alert {
            AlertDecision::Fire(kind) => {
                let payload = self.build_payload(kind, target, owner, &outcome, &failure, now);
                Some(self.deliver(target.id, &payload, now).await?)
            }
            AlertDecision::Suppressed(kind, reason) => {
                debug!(target_id = target.id, kind = kind.as_str(), reason = ?reason, "Alert suppressed.");
                None
            }
            AlertDecision::Quiet => None,
        };

        Ok(PipelineReport {
            target_id: target.id,
            outcome,
            save,
            transition: failure.transition,
            alert,
            alert_delivered,
        })
    }

    fn build_payload(
        &self,
        kind: AlertKind,
        target: &MonitoredTarget,
        owner: &OwnerContext,
        outcome: &ProbeOutcome,
        failure: &FailureUpdate,
        now: DateTime<Utc>,
    ) -> AlertPayload {
        let downtime_seconds = match kind {
            AlertKind::SlowResponse => None,
            AlertKind::Down | AlertKind::Recovery => failure.downtime.map(|d| d.num_seconds()),
        };
        AlertPayload {
            kind,
            target_id: target.id,
            recipients: recipients(target, &owner.user),
            recipient_name: owner.user.name.clone(),
            service_name: owner
                .service
                .as_ref()
                .map(|s| s.name.clone())
                .unwrap_or_else(|| "Unknown Service".to_string()),
            target_label: target.label.clone(),
            timestamp: now,
            status_code: outcome.status_code,
            error_message: outcome.error.clone(),
            response_time_ms: Some(outcome.latency_ms),
            downtime_seconds,
            templates: resolve_templates(
                target,
                owner.service.as_ref(),
                owner.alert_settings.as_ref(),
            ),
            webhook_url: owner
                .alert_settings
                .as_ref()
                .and_then(|s| s.active_webhook())
                .map(str::to_string),
        }
    }

    /// Dispatches an alert and records `last_alert_at` on success.
    async fn deliver(
        &self,
        target_id: TargetId,
        payload: &AlertPayload,
        now: DateTime<Utc>,
    ) -> Result<bool, PipelineError> {
        match self.dispatcher.dispatch(payload).await {
            Ok(()) => {
                self.store
                    .patch_target(
                        target_id,
                        &TargetPatch {
                            last_alert_at: Some(now),
                            ..Default::default()
                        },
                    )
                    .await?;
                info!(target_id, kind = payload.kind.as_str(), "Alert sent.");
                Ok(true)
            }
            Err(e) => {
                error!(
                    target_id,
                    kind = payload.kind.as_str(),
                    error = %e,
                    "Failed to dispatch alert. It will be retried on the next alert condition."
                );
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(address: Option<&str>) -> User {
        User {
            id: 1,
            name: Some("Ada".into()),
            email: None,
            notification_email: address.map(str::to_string),
            email_notifications_enabled: true,
        }
    }

    #[test]
    fn recipients_start_with_owner_and_skip_duplicates() {
        let mut target = MonitoredTarget::new(1, 1, "api", "https://example.com");
        target.additional_emails = vec![
            " OPS@example.com ".into(),
            "".into(),
            "ops@example.com".into(),
            "oncall@example.com".into(),
        ];
        assert_eq!(
            recipients(&target, &user(Some("ops@example.com"))),
            vec!["ops@example.com".to_string(), "oncall@example.com".to_string()]
        );
        assert_eq!(
            recipients(&target, &user(None)),
            vec!["OPS@example.com".to_string(), "oncall@example.com".to_string()]
        );
    }

    #[test]
    fn templates_resolve_target_service_settings() {
        let mut target = MonitoredTarget::new(1, 1, "api", "https://example.com");
        target.custom_templates.down_subject = Some("target subject".into());
        let service = Service {
            id: 1,
            user_id: Some(1),
            name: "Blog".into(),
            use_custom_alerts: true,
            custom_templates: AlertTemplateOverrides {
                down_subject: Some("service subject".into()),
                down_body: Some("service body".into()),
                ..Default::default()
            },
        };
        let mut settings = AlertSettings::new(1);
        settings.templates.recovery_body = Some("settings body".into());

        // Target overrides are ignored unless the target opts in.
        let resolved = resolve_templates(&target, Some(&service), Some(&settings));
        assert_eq!(resolved.down_subject.as_deref(), Some("service subject"));

        target.use_custom_alerts = true;
        let resolved = resolve_templates(&target, Some(&service), Some(&settings));
        assert_eq!(resolved.down_subject.as_deref(), Some("target subject"));
        assert_eq!(resolved.down_body.as_deref(), Some("service body"));
        assert_eq!(resolved.recovery_body.as_deref(), Some("settings body"));
        assert!(resolved.recovery_subject.is_none());
    }
}
