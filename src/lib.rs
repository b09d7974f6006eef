//! Self-hosted uptime monitoring backend.
//!
//! The interesting part lives in [`uptime`]: the scheduler that decides which
//! monitored URLs are due, the probe executor, the history persistence policy,
//! the consecutive-failure tracker and the alert decision engine. Storage and
//! notification delivery sit behind the [`db::UptimeStore`] and
//! [`notifications::service::NotificationDispatcher`] traits.

pub mod db;
pub mod notifications;
pub mod server;
pub mod uptime;
pub mod version;
