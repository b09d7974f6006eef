use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

use super::models::{ChannelConfig, RenderedMessage};

pub mod resend;
pub mod webhook;

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("Failed to send notification: {0}")]
    SendFailed(String),
    #[error("Invalid configuration for sender: {0}")]
    InvalidConfiguration(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// Delivers an already rendered alert over one channel type.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// * `config` - Channel configuration; senders reject configs of another type.
    /// * `message` - Rendered subject and HTML body.
    /// * `context` - Template variables, for channels that build their own payload.
    async fn send(
        &self,
        config: &ChannelConfig,
        message: &RenderedMessage,
        context: &HashMap<String, String>,
    ) -> Result<(), SenderError>;
}
