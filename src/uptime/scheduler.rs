//! Scheduler: selects due targets each tick and fans out one pipeline per target.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::pipeline::{OwnerContext, PipelineError, PipelineReport, TargetPipeline};
use crate::db::models::{MonitoredTarget, ServiceId, TargetId, UserId};
use crate::db::{StoreError, UptimeStore};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub due: usize,
    pub orphaned: usize,
    pub probed: usize,
    pub failed: usize,
    pub saved: usize,
    pub alerts_sent: usize,
    pub alerts_failed: usize,
}

impl TickSummary {
    fn record(&mut self, report: &PipelineReport) {
        self.probed += 1;
        if report.save.should_save() {
            self.saved += 1;
        }
        match report.alert_delivered {
            Some(true) => self.alerts_sent += 1,
            Some(false) => self.alerts_failed += 1,
            None => {}
        }
    }
}

pub struct Scheduler {
    store: Arc<dyn UptimeStore>,
    pipeline: Arc<TargetPipeline>,
    default_ping_interval: Duration,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn UptimeStore>,
        pipeline: Arc<TargetPipeline>,
        default_ping_interval: Duration,
    ) -> Self {
        Self {
            store,
            pipeline,
            default_ping_interval,
        }
    }

    /// Runs one tick at `now`.
    ///
    /// Only the initial target and owner lookups can fail the tick. Errors in
    /// individual pipelines are logged and counted in the summary.
    pub async fn run_tick(&self, now: DateTime<Utc>) -> Result<TickSummary, StoreError> {
        let due = self
            .store
            .list_due_targets(now, self.default_ping_interval)
            .await?;
        let mut summary = TickSummary {
            due: due.len(),
            ..Default::default()
        };
        if due.is_empty() {
            debug!("No targets due this tick.");
            return Ok(summary);
        }

        let user_ids: Vec<UserId> = due
            .iter()
            .filter_map(|t| t.user_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let service_ids: Vec<ServiceId> = due
            .iter()
            .map(|t| t.service_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let target_ids: Vec<TargetId> = due.iter().map(|t| t.id).collect();

        let (users, services, mut latest, settings) = futures::try_join!(
            self.store.get_users(&user_ids),
            self.store.get_services(&service_ids),
            self.store.latest_check_results(&target_ids),
            self.store.get_alert_settings(&user_ids),
        )?;

        let mut tasks: JoinSet<(TargetId, Result<PipelineReport, PipelineError>)> = JoinSet::new();
        for target in due {
            let Some(user) = target.user_id.and_then(|id| users.get(&id)) else {
                warn!(
                    target_id = target.id,
                    user_id = ?target.user_id,
                    "Skipping target without an owning user."
                );
                summary.orphaned += 1;
                continue;
            };
            let owner = OwnerContext {
                user: user.clone(),
                service: services.get(&target.service_id).cloned(),
                alert_settings: settings.get(&user.id).cloned(),
                previous_result: latest.remove(&target.id),
            };
            let pipeline = Arc::clone(&self.pipeline);
            tasks.spawn(run_one(pipeline, target, owner, now));
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(report))) => summary.record(&report),
                Ok((target_id, Err(e))) => {
                    summary.failed += 1;
                    error!(target_id, error = %e, "Uptime check pipeline failed.");
                }
                Err(e) => {
                    summary.failed += 1;
                    error!(error = %e, "Uptime check task panicked or was cancelled.");
                }
            }
        }

        info!(
            due = summary.due,
            probed = summary.probed,
            orphaned = summary.orphaned,
            failed = summary.failed,
            saved = summary.saved,
            alerts_sent = summary.alerts_sent,
            alerts_failed = summary.alerts_failed,
            "Uptime tick finished."
        );
        Ok(summary)
    }
}

async fn run_one(
    pipeline: Arc<TargetPipeline>,
    target: MonitoredTarget,
    owner: OwnerContext,
    now: DateTime<Utc>,
) -> (TargetId, Result<PipelineReport, PipelineError>) {
    let result = pipeline.run(&target, &owner, now).await;
    (target.id, result)
}
