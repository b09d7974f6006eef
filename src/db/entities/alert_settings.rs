use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::models::{self, AlertTemplateOverrides};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "alert_settings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub user_id: i32,
    /// Seconds.
    pub default_min_downtime: Option<i32>,
    pub default_consecutive_failures: Option<i32>,
    /// Minutes.
    pub default_alert_cooldown: Option<i32>,
    pub down_alert_subject: Option<String>,
    pub down_alert_body: Option<String>,
    pub recovery_alert_subject: Option<String>,
    pub recovery_alert_body: Option<String>,
    pub send_recovery_alerts: Option<bool>,
    pub enable_webhooks: Option<bool>,
    pub webhook_url: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for models::AlertSettings {
    fn from(model: Model) -> Self {
        models::AlertSettings {
            user_id: model.user_id,
            default_min_downtime_seconds: model.default_min_downtime,
            default_consecutive_failures: model.default_consecutive_failures,
            default_alert_cooldown_minutes: model.default_alert_cooldown,
            send_recovery_alerts: model.send_recovery_alerts.unwrap_or(true),
            templates: AlertTemplateOverrides {
                down_subject: model.down_alert_subject,
                down_body: model.down_alert_body,
                recovery_subject: model.recovery_alert_subject,
                recovery_body: model.recovery_alert_body,
            },
            enable_webhooks: model.enable_webhooks.unwrap_or(false),
            webhook_url: model.webhook_url,
        }
    }
}
