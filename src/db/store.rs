//! PostgreSQL-backed [`UptimeStore`].

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::collections::HashMap;
use tracing::{info, warn};

use super::models::{
    AlertSettings, CheckResult, MonitoredTarget, NewCheckResult, Service, ServiceId, TargetId,
    TargetPatch, User, UserId,
};
use super::{services, StoreError, UptimeStore};
use crate::db::entities::service_url;

/// Schema migrations embedded from `migrations/`.
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

#[derive(Debug)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let mut opt = ConnectOptions::new(database_url.to_owned());
        opt.sqlx_logging(false);
        let db = Database::connect(opt).await?;
        info!("Database connection established.");
        Ok(Self { db })
    }

    /// Applies pending migrations on the pool behind the SeaORM connection.
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        migrator()
            .run(self.db.get_postgres_connection_pool())
            .await?;
        info!("Database schema is up to date.");
        Ok(())
    }
}

/// Rows with unreadable settings are logged and skipped.
fn into_targets(models: Vec<service_url::Model>) -> Vec<MonitoredTarget> {
    models
        .into_iter()
        .filter_map(|model| {
            let target_id = model.id;
            match MonitoredTarget::try_from(model) {
                Ok(target) => Some(target),
                Err(e) => {
                    warn!(target_id, error = %e, "Skipping target with unreadable stored settings.");
                    None
                }
            }
        })
        .collect()
}

#[async_trait]
impl UptimeStore for SeaOrmStore {
    async fn list_monitorable_targets(&self) -> Result<Vec<MonitoredTarget>, StoreError> {
        Ok(into_targets(
            services::get_monitorable_targets(&self.db).await?,
        ))
    }

    async fn list_due_targets(
        &self,
        now: DateTime<Utc>,
        default_ping_interval: Duration,
    ) -> Result<Vec<MonitoredTarget>, StoreError> {
        let models =
            services::get_due_targets(&self.db, now, default_ping_interval.num_seconds()).await?;
        Ok(into_targets(models))
    }

    async fn list_targets_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<MonitoredTarget>, StoreError> {
        Ok(into_targets(
            services::get_targets_by_user_id(&self.db, user_id).await?,
        ))
    }

    async fn get_target(&self, id: TargetId) -> Result<Option<MonitoredTarget>, StoreError> {
        services::get_target_by_id(&self.db, id)
            .await?
            .map(MonitoredTarget::try_from)
            .transpose()
    }

    async fn insert_target(&self, target: MonitoredTarget) -> Result<MonitoredTarget, StoreError> {
        let model = services::create_target(&self.db, service_url::ActiveModel::from(&target)).await?;
        MonitoredTarget::try_from(model)
    }

    async fn patch_target(&self, id: TargetId, patch: &TargetPatch) -> Result<(), StoreError> {
        if patch.is_empty() {
            return Ok(());
        }
        let result = services::patch_target(&self.db, id, patch).await?;
        if result.rows_affected == 0 {
            return Err(StoreError::NotFound(format!("Target {id}")));
        }
        Ok(())
    }

    async fn delete_target(&self, id: TargetId) -> Result<(), StoreError> {
        let result = services::delete_target(&self.db, id).await?;
        if result.rows_affected == 0 {
            return Err(StoreError::NotFound(format!("Target {id}")));
        }
        Ok(())
    }

    async fn insert_check_result(
        &self,
        result: NewCheckResult,
    ) -> Result<CheckResult, StoreError> {
        Ok(services::record_check_result(&self.db, result).await?.into())
    }

    async fn latest_check_result(
        &self,
        target_id: TargetId,
    ) -> Result<Option<CheckResult>, StoreError> {
        let mut rows = services::get_recent_check_results(&self.db, target_id, 1).await?;
        Ok(rows.pop().map(CheckResult::from))
    }

    async fn latest_check_results(
        &self,
        target_ids: &[TargetId],
    ) -> Result<HashMap<TargetId, CheckResult>, StoreError> {
        let rows = services::get_latest_check_results(&self.db, target_ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| (row.service_url_id, CheckResult::from(row)))
            .collect())
    }

    async fn recent_check_results(
        &self,
        target_id: TargetId,
        limit: u64,
    ) -> Result<Vec<CheckResult>, StoreError> {
        let rows = services::get_recent_check_results(&self.db, target_id, limit).await?;
        Ok(rows.into_iter().map(CheckResult::from).collect())
    }

    async fn get_users(&self, ids: &[UserId]) -> Result<HashMap<UserId, User>, StoreError> {
        let rows = services::get_users_by_ids(&self.db, ids).await?;
        Ok(rows.into_iter().map(|m| (m.id, User::from(m))).collect())
    }

    async fn get_services(
        &self,
        ids: &[ServiceId],
    ) -> Result<HashMap<ServiceId, Service>, StoreError> {
        let rows = services::get_services_by_ids(&self.db, ids).await?;
        Ok(rows.into_iter().map(|m| (m.id, Service::from(m))).collect())
    }

    async fn get_alert_settings(
        &self,
        user_ids: &[UserId],
    ) -> Result<HashMap<UserId, AlertSettings>, StoreError> {
        let rows = services::get_alert_settings_by_user_ids(&self.db, user_ids).await?;
        Ok(rows
            .into_iter()
            .map(|m| (m.user_id, AlertSettings::from(m)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crate::db::entities::service_url::tests::fixture_model;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn patching_a_missing_target_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();
        let store = SeaOrmStore::new(db);
        let patch = TargetPatch {
            last_check_at: Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap()),
            ..Default::default()
        };
        assert!(matches!(
            store.patch_target(42, &patch).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn empty_patch_issues_no_statement() {
        // No mocked results: any query would fail.
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let store = SeaOrmStore::new(db);
        store.patch_target(42, &TargetPatch::default()).await.unwrap();
    }

    #[tokio::test]
    async fn unreadable_row_does_not_hide_other_targets() {
        let healthy = fixture_model(1);
        let mut broken = fixture_model(2);
        broken.alert_on_status_codes = Some(serde_json::json!(["500"]));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![healthy, broken]])
            .into_connection();
        let store = SeaOrmStore::new(db);

        let due = store
            .list_due_targets(Utc.timestamp_opt(1_700_000_000, 0).unwrap(), Duration::seconds(30))
            .await
            .unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, 1);
    }

    #[test]
    fn schema_migration_is_embedded() {
        let migrator = migrator();
        let versions: Vec<i64> = migrator.iter().map(|m| m.version).collect();
        assert_eq!(versions.first(), Some(&20250101000000));
        assert!(versions.windows(2).all(|w| w[0] < w[1]));
    }
}
