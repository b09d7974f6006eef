use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, DeleteResult, EntityTrait,
    QueryFilter, QueryOrder, UpdateResult, Value,
};

use crate::db::entities::{prelude::*, service_url};
use crate::db::models::{TargetId, TargetPatch, UserId};

// --- Target Service Functions ---

/// All targets not excluded from uptime checks, ordered by id.
pub async fn get_monitorable_targets(
    db: &DatabaseConnection,
) -> Result<Vec<service_url::Model>, DbErr> {
    ServiceUrl::find()
        .filter(Expr::cust("exclude_from_uptime IS NOT TRUE"))
        .order_by_asc(service_url::Column::Id)
        .all(db)
        .await
}

/// Monitorable targets whose ping interval has elapsed at `now`.
///
/// A non-positive or missing `ping_interval` uses `default_interval_secs`.
pub async fn get_due_targets(
    db: &DatabaseConnection,
    now: DateTime<Utc>,
    default_interval_secs: i64,
) -> Result<Vec<service_url::Model>, DbErr> {
    ServiceUrl::find()
        .filter(Expr::cust("exclude_from_uptime IS NOT TRUE"))
        .filter(Expr::cust_with_values(
            "(last_check_timestamp IS NULL OR last_check_timestamp <= ? - \
             (CASE WHEN ping_interval > 0 THEN ping_interval ELSE ? END) * INTERVAL '1 second')",
            [Value::from(now), Value::from(default_interval_secs)],
        ))
        .order_by_asc(service_url::Column::Id)
        .all(db)
        .await
}

pub async fn get_targets_by_user_id(
    db: &DatabaseConnection,
    user_id: UserId,
) -> Result<Vec<service_url::Model>, DbErr> {
    ServiceUrl::find()
        .filter(service_url::Column::UserId.eq(user_id))
        .order_by_asc(service_url::Column::Id)
        .all(db)
        .await
}

pub async fn get_target_by_id(
    db: &DatabaseConnection,
    target_id: TargetId,
) -> Result<Option<service_url::Model>, DbErr> {
    ServiceUrl::find_by_id(target_id).one(db).await
}

pub async fn create_target(
    db: &DatabaseConnection,
    target: service_url::ActiveModel,
) -> Result<service_url::Model, DbErr> {
    target.insert(db).await
}

/// Writes the set fields of `patch` in a single UPDATE statement.
pub async fn patch_target(
    db: &DatabaseConnection,
    target_id: TargetId,
    patch: &TargetPatch,
) -> Result<UpdateResult, DbErr> {
    if patch.is_empty() {
        return Ok(UpdateResult { rows_affected: 0 });
    }

    let mut update = ServiceUrl::update_many();
    if let Some(at) = patch.last_check_at {
        update = update.col_expr(service_url::Column::LastCheckTimestamp, Expr::value(Some(at)));
    }
    if let Some(at) = patch.last_save_at {
        update = update.col_expr(service_url::Column::LastSaveTimestamp, Expr::value(Some(at)));
    }
    if let Some(up) = patch.last_probe_up {
        update = update.col_expr(service_url::Column::LastProbeUp, Expr::value(Some(up)));
    }
    if let Some(failure) = patch.failure {
        let count = i32::try_from(failure.current_failure_count).unwrap_or(i32::MAX);
        update = update
            .col_expr(service_url::Column::CurrentFailureCount, Expr::value(count))
            .col_expr(
                service_url::Column::FirstFailureTimestamp,
                Expr::value(failure.first_failure_at),
            );
    }
    if let Some(at) = patch.last_alert_at {
        update = update.col_expr(service_url::Column::LastAlertTimestamp, Expr::value(Some(at)));
    }

    update
        .filter(service_url::Column::Id.eq(target_id))
        .exec(db)
        .await
}

/// Deletes a target. History rows go with it through `ON DELETE CASCADE`.
pub async fn delete_target(
    db: &DatabaseConnection,
    target_id: TargetId,
) -> Result<DeleteResult, DbErr> {
    ServiceUrl::delete_by_id(target_id).exec(db).await
}
