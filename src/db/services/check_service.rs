use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::db::entities::{prelude::*, uptime_check};
use crate::db::models::{NewCheckResult, TargetId};

// --- Check Result Service Functions ---

pub async fn record_check_result(
    db: &DatabaseConnection,
    result: NewCheckResult,
) -> Result<uptime_check::Model, DbErr> {
    let row = uptime_check::ActiveModel {
        service_url_id: Set(result.target_id),
        timestamp: Set(result.timestamp),
        is_up: Set(result.is_up),
        response_time: Set(result.response_time_ms),
        status_code: Set(result.status_code.map(i32::from)),
        error: Set(result.error),
        user_id: Set(result.user_id),
        ..Default::default()
    };
    row.insert(db).await
}

/// History rows for a target, newest first.
pub async fn get_recent_check_results(
    db: &DatabaseConnection,
    target_id: TargetId,
    limit: u64,
) -> Result<Vec<uptime_check::Model>, DbErr> {
    UptimeCheck::find()
        .filter(uptime_check::Column::ServiceUrlId.eq(target_id))
        .order_by_desc(uptime_check::Column::Timestamp)
        .order_by_desc(uptime_check::Column::Id)
        .limit(limit)
        .all(db)
        .await
}

/// The newest history row of each listed target, via `DISTINCT ON`.
pub async fn get_latest_check_results(
    db: &DatabaseConnection,
    target_ids: &[TargetId],
) -> Result<Vec<uptime_check::Model>, DbErr> {
    if target_ids.is_empty() {
        return Ok(Vec::new());
    }
    UptimeCheck::find()
        .distinct_on([uptime_check::Column::ServiceUrlId])
        .filter(uptime_check::Column::ServiceUrlId.is_in(target_ids.to_vec()))
        .order_by_asc(uptime_check::Column::ServiceUrlId)
        .order_by_desc(uptime_check::Column::Timestamp)
        .order_by_desc(uptime_check::Column::Id)
        .all(db)
        .await
}
