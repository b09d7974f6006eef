use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::models;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub notification_email: Option<String>,
    pub email_notifications_enabled: Option<bool>,
    pub created_at: ChronoDateTimeUtc,
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

impl From<Model> for models::User {
    fn from(model: Model) -> Self {
        models::User {
            id: model.id,
            name: model.name,
            email: model.email,
            notification_email: model.notification_email,
            email_notifications_enabled: model.email_notifications_enabled.unwrap_or(false),
        }
    }
}
