use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::models::CheckResult;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "uptime_checks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub service_url_id: i32,
    pub timestamp: ChronoDateTimeUtc,
    pub is_up: bool,
    /// Milliseconds.
    pub response_time: Option<i64>,
    pub status_code: Option<i32>,
    pub error: Option<String>,
    pub user_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::service_url::Entity",
        from = "Column::ServiceUrlId",
        to = "super::service_url::Column::Id",
        on_delete = "Cascade",
        on_update = "Cascade"
    )]
    ServiceUrl,
}

impl Related<super::service_url::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ServiceUrl.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for CheckResult {
    fn from(model: Model) -> Self {
        CheckResult {
            id: model.id,
            target_id: model.service_url_id,
            user_id: model.user_id,
            timestamp: model.timestamp,
            is_up: model.is_up,
            response_time_ms: model.response_time,
            status_code: model.status_code.and_then(|code| u16::try_from(code).ok()),
            error: model.error,
        }
    }
}
