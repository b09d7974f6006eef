use chrono::Duration;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::notifications::senders::resend::DEFAULT_RESEND_API_URL;
use crate::uptime::alert_engine::AlertDefaults;
use crate::uptime::EngineSettings;
use crate::version::default_user_agent;

/// Upper bound for every interval setting, in seconds.
const MAX_INTERVAL_SECONDS: u64 = 365 * 24 * 60 * 60;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML from config file at {path}: {source}")]
    ParseFile {
        path: String,
        source: toml::de::Error,
    },
    #[error("Failed to load config from environment: {0}")]
    Environment(#[from] envy::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// PostgreSQL connection string. Without it the server keeps state in memory.
    pub database_url: Option<String>,

    #[serde(default = "default_tick_interval_seconds")]
    pub tick_interval_seconds: u64,

    #[serde(default = "default_ping_interval_seconds")]
    pub default_ping_interval_seconds: u64,

    #[serde(default = "default_save_interval_minutes")]
    pub default_save_interval_minutes: u64,

    #[serde(default = "default_consecutive_failures")]
    pub default_consecutive_failures: u32,

    #[serde(default)]
    pub default_min_downtime_seconds: u64,

    #[serde(default = "default_alert_cooldown_minutes")]
    pub default_alert_cooldown_minutes: u64,

    #[serde(default = "default_probe_timeout_seconds")]
    pub probe_timeout_seconds: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// 64 hex characters (AES-256). Without it stored addresses are used as-is.
    pub encryption_key: Option<String>,

    pub resend_api_key: Option<String>,

    #[serde(default = "default_resend_api_url")]
    pub resend_api_url: String,

    #[serde(default = "default_email_from")]
    pub email_from: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug, Clone, PartialEq, Eq)]
pub struct PartialServerConfig {
    pub database_url: Option<String>,
    pub tick_interval_seconds: Option<u64>,
    pub default_ping_interval_seconds: Option<u64>,
    pub default_save_interval_minutes: Option<u64>,
    pub default_consecutive_failures: Option<u32>,
    pub default_min_downtime_seconds: Option<u64>,
    pub default_alert_cooldown_minutes: Option<u64>,
    pub probe_timeout_seconds: Option<u64>,
    pub user_agent: Option<String>,
    pub encryption_key: Option<String>,
    pub resend_api_key: Option<String>,
    pub resend_api_url: Option<String>,
    pub email_from: Option<String>,
    pub log_dir: Option<String>,
}

fn default_tick_interval_seconds() -> u64 {
    30
}

fn default_ping_interval_seconds() -> u64 {
    30
}

fn default_save_interval_minutes() -> u64 {
    10
}

fn default_consecutive_failures() -> u32 {
    1
}

fn default_alert_cooldown_minutes() -> u64 {
    15
}

fn default_probe_timeout_seconds() -> u64 {
    10
}

fn default_resend_api_url() -> String {
    DEFAULT_RESEND_API_URL.to_string()
}

fn default_email_from() -> String {
    "SelfHost Monitor <alerts@localhost>".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn seconds(value: u64) -> Duration {
    Duration::seconds(i64::try_from(value).unwrap_or(i64::MAX))
}

impl PartialServerConfig {
    /// Reads a TOML file. A missing file yields an empty partial config.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::ParseFile {
            path: path.display().to_string(),
            source,
        })
    }
}

impl ServerConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config = match config_path {
            Some(path) => PartialServerConfig::from_file(Path::new(path))?,
            None => PartialServerConfig::default(),
        };

        // 2. Load from environment variables
        let env_config: PartialServerConfig = envy::from_env::<PartialServerConfig>()?;

        // 3. Merge: environment overrides file
        Self::merge(file_config, env_config)
    }

    /// Environment values override file values; defaults fill the rest.
    pub fn merge(
        file_config: PartialServerConfig,
        env_config: PartialServerConfig,
    ) -> Result<Self, ConfigError> {
        let config = ServerConfig {
            database_url: non_blank(env_config.database_url).or(non_blank(file_config.database_url)),
            tick_interval_seconds: env_config
                .tick_interval_seconds
                .or(file_config.tick_interval_seconds)
                .unwrap_or_else(default_tick_interval_seconds),
            default_ping_interval_seconds: env_config
                .default_ping_interval_seconds
                .or(file_config.default_ping_interval_seconds)
                .unwrap_or_else(default_ping_interval_seconds),
            default_save_interval_minutes: env_config
                .default_save_interval_minutes
                .or(file_config.default_save_interval_minutes)
                .unwrap_or_else(default_save_interval_minutes),
            default_consecutive_failures: env_config
                .default_consecutive_failures
                .or(file_config.default_consecutive_failures)
                .unwrap_or_else(default_consecutive_failures),
            default_min_downtime_seconds: env_config
                .default_min_downtime_seconds
                .or(file_config.default_min_downtime_seconds)
                .unwrap_or(0),
            default_alert_cooldown_minutes: env_config
                .default_alert_cooldown_minutes
                .or(file_config.default_alert_cooldown_minutes)
                .unwrap_or_else(default_alert_cooldown_minutes),
            probe_timeout_seconds: env_config
                .probe_timeout_seconds
                .or(file_config.probe_timeout_seconds)
                .unwrap_or_else(default_probe_timeout_seconds),
            user_agent: non_blank(env_config.user_agent).or(non_blank(file_config.user_agent))
                .unwrap_or_else(default_user_agent),
            encryption_key: non_blank(env_config.encryption_key).or(non_blank(file_config.encryption_key)),
            resend_api_key: non_blank(env_config.resend_api_key).or(non_blank(file_config.resend_api_key)),
            resend_api_url: non_blank(env_config.resend_api_url).or(non_blank(file_config.resend_api_url))
                .unwrap_or_else(default_resend_api_url),
            email_from: non_blank(env_config.email_from).or(non_blank(file_config.email_from))
                .unwrap_or_else(default_email_from),
            log_dir: non_blank(env_config.log_dir).or(non_blank(file_config.log_dir))
                .unwrap_or_else(default_log_dir),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("tick_interval_seconds", self.tick_interval_seconds),
            ("default_ping_interval_seconds", self.default_ping_interval_seconds),
            ("default_save_interval_minutes", self.default_save_interval_minutes),
            ("probe_timeout_seconds", self.probe_timeout_seconds),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be greater than 0")));
            }
        }
        let bounded = [
            ("tick_interval_seconds", self.tick_interval_seconds),
            ("default_ping_interval_seconds", self.default_ping_interval_seconds),
            ("default_save_interval_minutes", self.default_save_interval_minutes.saturating_mul(60)),
            ("default_min_downtime_seconds", self.default_min_downtime_seconds),
            ("default_alert_cooldown_minutes", self.default_alert_cooldown_minutes.saturating_mul(60)),
            ("probe_timeout_seconds", self.probe_timeout_seconds),
        ];
        for (name, secs) in bounded {
            if secs > MAX_INTERVAL_SECONDS {
                return Err(ConfigError::Invalid(format!("{name} must not exceed one year")));
            }
        }
        if self.default_consecutive_failures == 0 {
            return Err(ConfigError::Invalid(
                "default_consecutive_failures must be at least 1".to_string(),
            ));
        }
        if let Some(key) = &self.encryption_key {
            if key.len() != 64 || !key.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ConfigError::Invalid(
                    "encryption_key must be 64 hex characters".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.tick_interval_seconds)
    }

    pub fn probe_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.probe_timeout_seconds)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            default_ping_interval: seconds(self.default_ping_interval_seconds),
            default_save_interval: seconds(self.default_save_interval_minutes.saturating_mul(60)),
            alert_defaults: AlertDefaults {
                min_downtime_seconds: i64::try_from(self.default_min_downtime_seconds)
                    .unwrap_or(i64::MAX),
                consecutive_failures: self.default_consecutive_failures,
                cooldown_minutes: i64::try_from(self.default_alert_cooldown_minutes)
                    .unwrap_or(i64::MAX),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_fill_everything() {
        let config =
            ServerConfig::merge(PartialServerConfig::default(), PartialServerConfig::default())
                .unwrap();
        assert_eq!(config.database_url, None);
        assert_eq!(config.tick_interval_seconds, 30);
        assert_eq!(config.default_ping_interval_seconds, 30);
        assert_eq!(config.default_save_interval_minutes, 10);
        assert_eq!(config.default_consecutive_failures, 1);
        assert_eq!(config.default_min_downtime_seconds, 0);
        assert_eq!(config.default_alert_cooldown_minutes, 15);
        assert_eq!(config.probe_timeout_seconds, 10);
        assert!(config.user_agent.starts_with("SelfHost-Monitor/"));
        assert_eq!(config.resend_api_url, "https://api.resend.com");
        assert_eq!(config.log_dir, "logs");

        let engine = config.engine_settings();
        assert_eq!(engine.default_save_interval, Duration::minutes(10));
        assert_eq!(engine.alert_defaults, AlertDefaults::default());
    }

    #[test]
    fn environment_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
database_url = "postgres://file/db"
tick_interval_seconds = 60
log_dir = "/var/log/monitor"
"#
        )
        .unwrap();

        let file_config = PartialServerConfig::from_file(file.path()).unwrap();
        assert_eq!(file_config.tick_interval_seconds, Some(60));

        let env_config = PartialServerConfig {
            tick_interval_seconds: Some(15),
            ..Default::default()
        };
        let config = ServerConfig::merge(file_config, env_config).unwrap();
        assert_eq!(config.tick_interval_seconds, 15);
        assert_eq!(config.database_url.as_deref(), Some("postgres://file/db"));
        assert_eq!(config.log_dir, "/var/log/monitor");
    }

    #[test]
    fn missing_file_is_empty_and_bad_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert_eq!(
            PartialServerConfig::from_file(&missing).unwrap(),
            PartialServerConfig::default()
        );

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "tick_interval_seconds = \"soon\"").unwrap();
        assert!(matches!(
            PartialServerConfig::from_file(&bad),
            Err(ConfigError::ParseFile { .. })
        ));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let zero_tick = PartialServerConfig {
            tick_interval_seconds: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            ServerConfig::merge(zero_tick, PartialServerConfig::default()),
            Err(ConfigError::Invalid(_))
        ));

        let short_key = PartialServerConfig {
            encryption_key: Some("abc123".into()),
            ..Default::default()
        };
        assert!(matches!(
            ServerConfig::merge(PartialServerConfig::default(), short_key),
            Err(ConfigError::Invalid(_))
        ));

        let blank_key = PartialServerConfig {
            encryption_key: Some("   ".into()),
            ..Default::default()
        };
        let config = ServerConfig::merge(PartialServerConfig::default(), blank_key).unwrap();
        assert_eq!(config.encryption_key, None);
    }
}
