use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::models::{self, AlertTemplateOverrides};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "services")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    // Encrypted at rest; never read by the uptime engine.
    pub notes: Option<String>,
    pub device_id: Option<i32>,
    pub user_id: Option<i32>,
    pub use_custom_alerts: Option<bool>,
    pub custom_down_alert_subject: Option<String>,
    pub custom_down_alert_body: Option<String>,
    pub custom_recovery_alert_subject: Option<String>,
    pub custom_recovery_alert_body: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::service_url::Entity")]
    ServiceUrl,
}

impl Related<super::service_url::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ServiceUrl.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for models::Service {
    fn from(model: Model) -> Self {
        models::Service {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
            use_custom_alerts: model.use_custom_alerts.unwrap_or(false),
            custom_templates: AlertTemplateOverrides {
                down_subject: model.custom_down_alert_subject,
                down_body: model.custom_down_alert_body,
                recovery_subject: model.custom_recovery_alert_subject,
                recovery_body: model.custom_recovery_alert_body,
            },
        }
    }
}
