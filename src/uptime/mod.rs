//! The uptime-check scheduling and alerting engine.
//!
//! Data flow per tick: [`scheduler`] selects due targets and prefetches owner
//! data, then runs one [`pipeline`] per target concurrently. A pipeline stamps
//! the target, runs the [`probe`], applies the [`persistence`] policy, advances
//! the failure [`tracker`] and asks the [`alert_engine`] whether to notify.

pub mod alert_engine;
pub mod persistence;
pub mod pipeline;
pub mod probe;
pub mod scheduler;
pub mod tracker;

pub use pipeline::{EngineSettings, OwnerContext, PipelineError, PipelineReport, TargetPipeline};
pub use probe::{ProbeExecutor, ProbeOutcome};
pub use scheduler::{Scheduler, TickSummary};
