//! Failure/Recovery Tracker.
//!
//! | prev_up        | up    | effect                                   |
//! |----------------|-------|------------------------------------------|
//! | true / unknown | true  | none                                     |
//! | true / unknown | false | count = 1, first failure = now           |
//! | false          | false | count += 1, first failure kept           |
//! | false          | true  | count = 0, first failure cleared         |

use chrono::{DateTime, Duration, Utc};

use crate::db::models::FailureState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    StillUp,
    WentDown,
    StillDown,
    Recovered,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FailureUpdate {
    pub state: FailureState,
    pub transition: Transition,
    /// Length of the ongoing outage, or of the outage that just ended on recovery.
    pub downtime: Option<Duration>,
}

impl FailureUpdate {
    pub fn changed_from(&self, previous: &FailureState) -> bool {
        self.state != *previous
    }
}

pub fn advance(
    previous: &FailureState,
    prev_up: Option<bool>,
    up: bool,
    now: DateTime<Utc>,
) -> FailureUpdate {
    match (prev_up, up) {
        (Some(false), true) => FailureUpdate {
            state: FailureState::default(),
            transition: Transition::Recovered,
            downtime: previous.first_failure_at.map(|first| now - first),
        },
        (Some(false), false) => {
            // Counter may be missing for rows written before it existed.
            let first = previous.first_failure_at.unwrap_or(now);
            FailureUpdate {
                state: FailureState {
                    current_failure_count: previous.current_failure_count.saturating_add(1),
                    first_failure_at: Some(first),
                },
                transition: Transition::StillDown,
                downtime: Some(now - first),
            }
        }
        (_, false) => FailureUpdate {
            state: FailureState {
                current_failure_count: 1,
                first_failure_at: Some(now),
            },
            transition: Transition::WentDown,
            downtime: Some(Duration::zero()),
        },
        (_, true) => FailureUpdate {
            state: *previous,
            transition: Transition::StillUp,
            downtime: None,
        },
    }
}
