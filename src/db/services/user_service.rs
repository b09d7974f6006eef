use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};

use crate::db::entities::{alert_settings, prelude::*, service, user};
use crate::db::models::{ServiceId, UserId};

// --- Owner Lookups ---

pub async fn get_users_by_ids(
    db: &DatabaseConnection,
    ids: &[UserId],
) -> Result<Vec<user::Model>, DbErr> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    User::find()
        .filter(user::Column::Id.is_in(ids.to_vec()))
        .all(db)
        .await
}

pub async fn get_services_by_ids(
    db: &DatabaseConnection,
    ids: &[ServiceId],
) -> Result<Vec<service::Model>, DbErr> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    Service::find()
        .filter(service::Column::Id.is_in(ids.to_vec()))
        .all(db)
        .await
}

pub async fn get_alert_settings_by_user_ids(
    db: &DatabaseConnection,
    user_ids: &[UserId],
) -> Result<Vec<alert_settings::Model>, DbErr> {
    if user_ids.is_empty() {
        return Ok(Vec::new());
    }
    AlertSettings::find()
        .filter(alert_settings::Column::UserId.is_in(user_ids.to_vec()))
        .all(db)
        .await
}
