//! In-memory [`UptimeStore`] used by tests and when no database is configured.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, AtomicI64, Ordering};

use super::models::{
    AlertSettings, CheckResult, MonitoredTarget, NewCheckResult, Service, ServiceId, TargetId,
    TargetPatch, User, UserId,
};
use super::{StoreError, UptimeStore};

#[derive(Debug, Default)]
pub struct MemoryStore {
    targets: DashMap<TargetId, MonitoredTarget>,
    // History rows per target, in insertion (= chronological) order.
    results: DashMap<TargetId, Vec<CheckResult>>,
    users: DashMap<UserId, User>,
    services: DashMap<ServiceId, Service>,
    alert_settings: DashMap<UserId, AlertSettings>,
    next_target_id: AtomicI32,
    next_result_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user: User) {
        self.users.insert(user.id, user);
    }

    pub fn insert_service(&self, service: Service) {
        self.services.insert(service.id, service);
    }

    pub fn put_alert_settings(&self, settings: AlertSettings) {
        self.alert_settings.insert(settings.user_id, settings);
    }

    /// Total number of history rows across all targets.
    pub fn check_result_count(&self) -> usize {
        self.results.iter().map(|entry| entry.value().len()).sum()
    }
}

#[async_trait]
impl UptimeStore for MemoryStore {
    async fn list_monitorable_targets(&self) -> Result<Vec<MonitoredTarget>, StoreError> {
        let mut targets: Vec<MonitoredTarget> = self
            .targets
            .iter()
            .filter(|entry| !entry.value().exclude_from_uptime)
            .map(|entry| entry.value().clone())
            .collect();
        targets.sort_by_key(|t| t.id);
        Ok(targets)
    }

    async fn list_targets_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<MonitoredTarget>, StoreError> {
        let mut targets: Vec<MonitoredTarget> = self
            .targets
            .iter()
            .filter(|entry| entry.value().user_id == Some(user_id))
            .map(|entry| entry.value().clone())
            .collect();
        targets.sort_by_key(|t| t.id);
        Ok(targets)
    }

    async fn get_target(&self, id: TargetId) -> Result<Option<MonitoredTarget>, StoreError> {
        Ok(self.targets.get(&id).map(|entry| entry.value().clone()))
    }

    async fn insert_target(
        &self,
        mut target: MonitoredTarget,
    ) -> Result<MonitoredTarget, StoreError> {
        target.id = self.next_target_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.targets.insert(target.id, target.clone());
        Ok(target)
    }

    async fn patch_target(&self, id: TargetId, patch: &TargetPatch) -> Result<(), StoreError> {
        let mut entry = self
            .targets
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Target {id}")))?;
        patch.apply_to(&mut entry.state);
        Ok(())
    }

    async fn delete_target(&self, id: TargetId) -> Result<(), StoreError> {
        if self.targets.remove(&id).is_none() {
            return Err(StoreError::NotFound(format!("Target {id}")));
        }
        self.results.remove(&id);
        Ok(())
    }

    async fn insert_check_result(
        &self,
        result: NewCheckResult,
    ) -> Result<CheckResult, StoreError> {
        let row = CheckResult {
            id: self.next_result_id.fetch_add(1, Ordering::SeqCst) + 1,
            target_id: result.target_id,
            user_id: result.user_id,
            timestamp: result.timestamp,
            is_up: result.is_up,
            response_time_ms: result.response_time_ms,
            status_code: result.status_code,
            error: result.error,
        };
        self.results
            .entry(row.target_id)
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn latest_check_result(
        &self,
        target_id: TargetId,
    ) -> Result<Option<CheckResult>, StoreError> {
        Ok(self
            .results
            .get(&target_id)
            .and_then(|rows| rows.value().iter().max_by_key(|r| (r.timestamp, r.id)).cloned()))
    }

    async fn latest_check_results(
        &self,
        target_ids: &[TargetId],
    ) -> Result<HashMap<TargetId, CheckResult>, StoreError> {
        let mut latest = HashMap::with_capacity(target_ids.len());
        for id in target_ids {
            if let Some(row) = self.latest_check_result(*id).await? {
                latest.insert(*id, row);
            }
        }
        Ok(latest)
    }

    async fn recent_check_results(
        &self,
        target_id: TargetId,
        limit: u64,
    ) -> Result<Vec<CheckResult>, StoreError> {
        let mut rows = self
            .results
            .get(&target_id)
            .map(|rows| rows.value().clone())
            .unwrap_or_default();
        rows.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }

    async fn get_users(&self, ids: &[UserId]) -> Result<HashMap<UserId, User>, StoreError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.users.get(id).map(|u| (*id, u.value().clone())))
            .collect())
    }

    async fn get_services(
        &self,
        ids: &[ServiceId],
    ) -> Result<HashMap<ServiceId, Service>, StoreError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.services.get(id).map(|s| (*id, s.value().clone())))
            .collect())
    }

    async fn get_alert_settings(
        &self,
        user_ids: &[UserId],
    ) -> Result<HashMap<UserId, AlertSettings>, StoreError> {
        Ok(user_ids
            .iter()
            .filter_map(|id| self.alert_settings.get(id).map(|s| (*id, s.value().clone())))
            .collect())
    }
}
