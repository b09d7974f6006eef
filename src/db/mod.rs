//! Storage layer.
//!
//! The uptime engine only talks to [`UptimeStore`]. Two implementations are
//! provided: [`memory::MemoryStore`] for tests and database-less runs, and
//! [`store::SeaOrmStore`] backed by PostgreSQL through SeaORM.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use thiserror::Error;

pub mod entities;
pub mod memory;
pub mod models;
pub mod services;
pub mod store;

use models::{
    AlertSettings, CheckResult, MonitoredTarget, NewCheckResult, Service, ServiceId, TargetId,
    TargetPatch, User, UserId,
};

/// Default page size for history queries.
pub const DEFAULT_HISTORY_LIMIT: u64 = 100;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Invalid stored data: {0}")]
    InvalidData(String),
    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
}

/// The storage operations the uptime engine depends on.
///
/// Implementations must make [`UptimeStore::patch_target`] an atomic
/// single-row update; nothing here needs multi-row transactions.
#[async_trait]
pub trait UptimeStore: Send + Sync {
    /// All targets that are not excluded from uptime checks.
    async fn list_monitorable_targets(&self) -> Result<Vec<MonitoredTarget>, StoreError>;

    /// Monitorable targets whose probe interval has elapsed at `now`.
    ///
    /// The default implementation filters [`UptimeStore::list_monitorable_targets`];
    /// stores with an index on the last check time should push the predicate down.
    async fn list_due_targets(
        &self,
        now: DateTime<Utc>,
        default_ping_interval: Duration,
    ) -> Result<Vec<MonitoredTarget>, StoreError> {
        let targets = self.list_monitorable_targets().await?;
        Ok(targets
            .into_iter()
            .filter(|t| t.is_due(now, default_ping_interval))
            .collect())
    }

    async fn list_targets_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<MonitoredTarget>, StoreError>;

    async fn get_target(&self, id: TargetId) -> Result<Option<MonitoredTarget>, StoreError>;

    /// Inserts a target; the `id` field of the argument is ignored.
    async fn insert_target(&self, target: MonitoredTarget) -> Result<MonitoredTarget, StoreError>;

    async fn patch_target(&self, id: TargetId, patch: &TargetPatch) -> Result<(), StoreError>;

    /// Deletes a target and all of its history rows.
    async fn delete_target(&self, id: TargetId) -> Result<(), StoreError>;

    async fn insert_check_result(&self, result: NewCheckResult)
        -> Result<CheckResult, StoreError>;

    async fn latest_check_result(
        &self,
        target_id: TargetId,
    ) -> Result<Option<CheckResult>, StoreError>;

    /// Latest history row per target, for every target that has one.
    async fn latest_check_results(
        &self,
        target_ids: &[TargetId],
    ) -> Result<HashMap<TargetId, CheckResult>, StoreError>;

    /// History rows for a target, newest first.
    async fn recent_check_results(
        &self,
        target_id: TargetId,
        limit: u64,
    ) -> Result<Vec<CheckResult>, StoreError>;

    async fn get_users(&self, ids: &[UserId]) -> Result<HashMap<UserId, User>, StoreError>;

    async fn get_services(
        &self,
        ids: &[ServiceId],
    ) -> Result<HashMap<ServiceId, Service>, StoreError>;

    async fn get_alert_settings(
        &self,
        user_ids: &[UserId],
    ) -> Result<HashMap<UserId, AlertSettings>, StoreError>;
}
