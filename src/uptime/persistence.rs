//! Check Persistence Policy: whether a probe outcome becomes a history row.
//!
//! `save = status changed || now - last_save >= save_interval`. The last save
//! falls back to the previous history row's timestamp, then to the epoch, so
//! the first probe of a target is always saved.

use chrono::{DateTime, Duration, Utc};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveReason {
    StatusChanged,
    IntervalElapsed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveDecision {
    Save(SaveReason),
    Skip,
}

impl SaveDecision {
    pub fn should_save(&self) -> bool {
        matches!(self, SaveDecision::Save(_))
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SaveInput {
    pub up: bool,
    /// Outcome of the previous probe, if any.
    pub prev_up: Option<bool>,
    pub last_save_at: Option<DateTime<Utc>>,
    /// Timestamp of the newest persisted history row.
    pub previous_result_at: Option<DateTime<Utc>>,
    pub save_interval_minutes: Option<i32>,
    pub now: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug)]
pub struct PersistencePolicy {
    default_interval: Duration,
}

impl PersistencePolicy {
    pub fn new(default_interval: Duration) -> Self {
        Self { default_interval }
    }

    pub fn save_interval(&self, minutes: Option<i32>) -> Duration {
        match minutes {
            Some(m) if m > 0 => Duration::minutes(i64::from(m)),
            _ => self.default_interval,
        }
    }

    /// Pure function of its input.
    pub fn decide(&self, input: &SaveInput) -> SaveDecision {
        if input.prev_up.is_some_and(|prev| prev != input.up) {
            return SaveDecision::Save(SaveReason::StatusChanged);
        }
        let last_save = input
            .last_save_at
            .or(input.previous_result_at)
            .unwrap_or(DateTime::UNIX_EPOCH);
        if input.now - last_save >= self.save_interval(input.save_interval_minutes) {
            SaveDecision::Save(SaveReason::IntervalElapsed)
        } else {
            SaveDecision::Skip
        }
    }
}

impl Default for PersistencePolicy {
    fn default() -> Self {
        Self::new(Duration::minutes(10))
    }
}
