//! Probe Executor: one HTTP GET against a target, normalized into a [`ProbeOutcome`].

use reqwest::redirect::Policy;
use std::time::{Duration, Instant};
use tracing::debug;

/// Maximum number of redirects followed before the probe counts as failed.
const MAX_REDIRECTS: usize = 10;

/// Result of a single probe. Never an error: every failure mode is a down outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub up: bool,
    pub latency_ms: u64,
    pub status_code: Option<u16>,
    pub error: Option<String>,
}

impl ProbeOutcome {
    pub fn up(latency_ms: u64, status_code: u16) -> Self {
        Self {
            up: true,
            latency_ms,
            status_code: Some(status_code),
            error: None,
        }
    }

    pub fn down(latency_ms: u64, status_code: Option<u16>, error: Option<String>) -> Self {
        Self {
            up: false,
            latency_ms,
            status_code,
            error,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ProbeExecutor {
    client: reqwest::Client,
}

impl ProbeExecutor {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(Self { client })
    }

    /// Issues a GET against `url`. 2xx is up; anything else, including
    /// transport errors and timeouts, is down.
    pub async fn probe(&self, url: &str) -> ProbeOutcome {
        let start_time = Instant::now();
        let result = self.client.get(url).send().await;
        let latency_ms = u64::try_from(start_time.elapsed().as_millis()).unwrap_or(u64::MAX);

        let outcome = match result {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    ProbeOutcome::up(latency_ms, status.as_u16())
                } else {
                    ProbeOutcome::down(latency_ms, Some(status.as_u16()), None)
                }
            }
            Err(e) => {
                let message = if e.is_timeout() {
                    "Request timed out".to_string()
                } else {
                    e.to_string()
                };
                ProbeOutcome::down(latency_ms, e.status().map(|s| s.as_u16()), Some(message))
            }
        };
        debug!(
            url = %url,
            up = outcome.up,
            latency_ms = outcome.latency_ms,
            status_code = ?outcome.status_code,
            "Probe finished."
        );
        outcome
    }
}
