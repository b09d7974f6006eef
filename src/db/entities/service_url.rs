use sea_orm::entity::prelude::*;
use sea_orm::{NotSet, Set};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::db::models::{AlertTemplateOverrides, MonitoredTarget, TargetRuntimeState};
use crate::db::StoreError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "service_urls")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub service_id: i32,
    pub user_id: Option<i32>,
    pub label: String,
    pub url: String,
    /// Seconds.
    pub ping_interval: Option<i32>,
    /// Minutes.
    pub save_interval: Option<i32>,
    pub exclude_from_uptime: Option<bool>,
    pub email_alerts_enabled: Option<bool>,
    pub notify_on_down: Option<bool>,
    pub notify_on_recovery: Option<bool>,
    /// Seconds.
    pub min_downtime_duration: Option<i32>,
    pub consecutive_failures: Option<i32>,
    /// Minutes.
    pub alert_cooldown: Option<i32>,
    pub alert_on_slow_response: Option<bool>,
    /// Milliseconds.
    pub slow_response_threshold: Option<i32>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub alert_on_status_codes: Option<Json>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub ignore_status_codes: Option<Json>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub additional_emails: Option<Json>,
    pub use_custom_alerts: Option<bool>,
    pub custom_down_alert_subject: Option<String>,
    pub custom_down_alert_body: Option<String>,
    pub custom_recovery_alert_subject: Option<String>,
    pub custom_recovery_alert_body: Option<String>,
    pub last_check_timestamp: Option<ChronoDateTimeUtc>,
    pub last_save_timestamp: Option<ChronoDateTimeUtc>,
    pub last_probe_up: Option<bool>,
    pub current_failure_count: i32,
    pub first_failure_timestamp: Option<ChronoDateTimeUtc>,
    pub last_alert_timestamp: Option<ChronoDateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::service::Entity",
        from = "Column::ServiceId",
        to = "super::service::Column::Id",
        on_delete = "Cascade"
    )]
    Service,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    User,

    #[sea_orm(has_many = "super::uptime_check::Entity")]
    UptimeCheck,
}

impl Related<super::service::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Service.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::uptime_check::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UptimeCheck.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

fn json_list<T: DeserializeOwned>(
    value: Option<Json>,
    column: &str,
    id: i32,
) -> Result<Vec<T>, StoreError> {
    match value {
        None | Some(Json::Null) => Ok(Vec::new()),
        Some(v) => serde_json::from_value(v).map_err(|e| {
            StoreError::InvalidData(format!("service_urls.{column} for row {id}: {e}"))
        }),
    }
}

fn list_json<T: Serialize>(items: &[T]) -> Option<Json> {
    if items.is_empty() {
        None
    } else {
        serde_json::to_value(items).ok()
    }
}

impl TryFrom<Model> for MonitoredTarget {
    type Error = StoreError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let failure_count = u32::try_from(model.current_failure_count).unwrap_or(0);
        Ok(MonitoredTarget {
            id: model.id,
            user_id: model.user_id,
            service_id: model.service_id,
            label: model.label,
            url: model.url,
            ping_interval_seconds: model.ping_interval,
            save_interval_minutes: model.save_interval,
            exclude_from_uptime: model.exclude_from_uptime.unwrap_or(false),
            email_alerts_enabled: model.email_alerts_enabled.unwrap_or(false),
            notify_on_down: model.notify_on_down.unwrap_or(true),
            notify_on_recovery: model.notify_on_recovery.unwrap_or(true),
            min_downtime_seconds: model.min_downtime_duration,
            consecutive_failures: model.consecutive_failures,
            alert_cooldown_minutes: model.alert_cooldown,
            alert_on_slow_response: model.alert_on_slow_response.unwrap_or(false),
            slow_response_threshold_ms: model.slow_response_threshold,
            alert_on_status_codes: json_list(
                model.alert_on_status_codes,
                "alert_on_status_codes",
                model.id,
            )?,
            ignore_status_codes: json_list(
                model.ignore_status_codes,
                "ignore_status_codes",
                model.id,
            )?,
            additional_emails: json_list(model.additional_emails, "additional_emails", model.id)?,
            use_custom_alerts: model.use_custom_alerts.unwrap_or(false),
            custom_templates: AlertTemplateOverrides {
                down_subject: model.custom_down_alert_subject,
                down_body: model.custom_down_alert_body,
                recovery_subject: model.custom_recovery_alert_subject,
                recovery_body: model.custom_recovery_alert_body,
            },
            state: TargetRuntimeState {
                last_check_at: model.last_check_timestamp,
                last_save_at: model.last_save_timestamp,
                last_probe_up: model.last_probe_up,
                // A zero count never carries a first-failure timestamp.
                current_failure_count: failure_count,
                first_failure_at: if failure_count == 0 {
                    None
                } else {
                    model.first_failure_timestamp
                },
                last_alert_at: model.last_alert_timestamp,
            },
        })
    }
}

impl From<&MonitoredTarget> for ActiveModel {
    fn from(target: &MonitoredTarget) -> Self {
        let state = &target.state;
        ActiveModel {
            id: NotSet,
            service_id: Set(target.service_id),
            user_id: Set(target.user_id),
            label: Set(target.label.clone()),
            url: Set(target.url.clone()),
            ping_interval: Set(target.ping_interval_seconds),
            save_interval: Set(target.save_interval_minutes),
            exclude_from_uptime: Set(Some(target.exclude_from_uptime)),
            email_alerts_enabled: Set(Some(target.email_alerts_enabled)),
            notify_on_down: Set(Some(target.notify_on_down)),
            notify_on_recovery: Set(Some(target.notify_on_recovery)),
            min_downtime_duration: Set(target.min_downtime_seconds),
            consecutive_failures: Set(target.consecutive_failures),
            alert_cooldown: Set(target.alert_cooldown_minutes),
            alert_on_slow_response: Set(Some(target.alert_on_slow_response)),
            slow_response_threshold: Set(target.slow_response_threshold_ms),
            alert_on_status_codes: Set(list_json(&target.alert_on_status_codes)),
            ignore_status_codes: Set(list_json(&target.ignore_status_codes)),
            additional_emails: Set(list_json(&target.additional_emails)),
            use_custom_alerts: Set(Some(target.use_custom_alerts)),
            custom_down_alert_subject: Set(target.custom_templates.down_subject.clone()),
            custom_down_alert_body: Set(target.custom_templates.down_body.clone()),
            custom_recovery_alert_subject: Set(target.custom_templates.recovery_subject.clone()),
            custom_recovery_alert_body: Set(target.custom_templates.recovery_body.clone()),
            last_check_timestamp: Set(state.last_check_at),
            last_save_timestamp: Set(state.last_save_at),
            last_probe_up: Set(state.last_probe_up),
            current_failure_count: Set(i32::try_from(state.current_failure_count).unwrap_or(i32::MAX)),
            first_failure_timestamp: Set(state.first_failure_at),
            last_alert_timestamp: Set(state.last_alert_at),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    pub(crate) fn fixture_model(id: i32) -> Model {
        Model {
            id,
            service_id: 1,
            user_id: Some(9),
            label: "api".into(),
            url: "https://example.com".into(),
            ping_interval: None,
            save_interval: None,
            exclude_from_uptime: None,
            email_alerts_enabled: None,
            notify_on_down: None,
            notify_on_recovery: None,
            min_downtime_duration: None,
            consecutive_failures: Some(3),
            alert_cooldown: None,
            alert_on_slow_response: None,
            slow_response_threshold: None,
            alert_on_status_codes: Some(serde_json::json!([500, 503])),
            ignore_status_codes: None,
            additional_emails: Some(serde_json::json!(["ops@example.com"])),
            use_custom_alerts: None,
            custom_down_alert_subject: None,
            custom_down_alert_body: None,
            custom_recovery_alert_subject: None,
            custom_recovery_alert_body: None,
            last_check_timestamp: None,
            last_save_timestamp: None,
            last_probe_up: None,
            current_failure_count: 0,
            first_failure_timestamp: Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap()),
            last_alert_timestamp: None,
        }
    }

    #[test]
    fn nullable_flags_take_defaults() {
        let target = MonitoredTarget::try_from(fixture_model(3)).unwrap();
        assert!(target.notify_on_down);
        assert!(target.notify_on_recovery);
        assert!(!target.email_alerts_enabled);
        assert!(!target.exclude_from_uptime);
        assert_eq!(target.alert_on_status_codes, vec![500, 503]);
        assert_eq!(target.additional_emails, vec!["ops@example.com".to_string()]);
        // Stale first-failure timestamp is dropped when the count is zero.
        assert_eq!(target.state.first_failure_at, None);
    }

    #[test]
    fn malformed_json_list_is_rejected() {
        let mut bad = fixture_model(3);
        bad.ignore_status_codes = Some(serde_json::json!({"code": 503}));
        assert!(matches!(
            MonitoredTarget::try_from(bad),
            Err(StoreError::InvalidData(_))
        ));
    }
}
