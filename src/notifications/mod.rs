//! Alert delivery: payload models, templates, senders and address encryption.

pub mod encryption;
pub mod models;
pub mod senders;
pub mod service;
pub mod templates;

pub use service::{NotificationDispatcher, NotificationError, NotificationService};
