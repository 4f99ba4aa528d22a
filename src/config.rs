use std::path::PathBuf;

use tracing::trace;

use crate::{AlertCategory, RecipientId, parsers::ParserKind};

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Config {
    /// Log files to tail. A missing path is not a startup error; its
    /// supervisor starts anyway and retries.
    pub sources: Option<Vec<SourceConfig>>,

    /// Resource thresholds (optional - defaults to 90/90/95).
    pub limits: Option<Limits>,

    /// Retry/backoff/delivery timing overrides.
    pub tuning: Option<Tuning>,

    /// Statically configured recipients for the shipped webhook channel.
    pub recipients: Option<Vec<RecipientConfig>>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct SourceConfig {
    pub path: PathBuf,
    pub category: AlertCategory,
    pub parser: ParserKind,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Limits {
    #[serde(default = "default_cpu_threshold")]
    pub cpu_pct: f32,
    #[serde(default = "default_ram_threshold")]
    pub ram_pct: f32,
    #[serde(default = "default_disk_threshold")]
    pub disk_pct: f32,

    /// Minimum seconds between repeated reminders for the same metric.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Seconds between metric samples (also the initial startup delay).
    #[serde(default = "default_sample_interval_secs")]
    pub sample_interval_secs: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            cpu_pct: default_cpu_threshold(),
            ram_pct: default_ram_threshold(),
            disk_pct: default_disk_threshold(),
            cooldown_secs: default_cooldown_secs(),
            sample_interval_secs: default_sample_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Tuning {
    /// Backoff while the log file does not exist (or is unreadable).
    #[serde(default = "default_missing_retry_secs")]
    pub missing_retry_secs: u64,

    /// Delay before restarting a stream after a read error.
    #[serde(default = "default_read_error_retry_secs")]
    pub read_error_retry_secs: u64,

    /// Pause between two consecutive recipient deliveries.
    #[serde(default = "default_send_delay_ms")]
    pub send_delay_ms: u64,
}

impl Default for Tuning {
    fn default() -> Self {
        Tuning {
            missing_retry_secs: default_missing_retry_secs(),
            read_error_retry_secs: default_read_error_retry_secs(),
            send_delay_ms: default_send_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct RecipientConfig {
    pub id: RecipientId,
    /// Webhook endpoint alerts for this recipient are POSTed to.
    pub url: String,
    /// Alert categories this recipient subscribed to.
    pub categories: Vec<AlertCategory>,
}

fn default_cpu_threshold() -> f32 {
    90.0
}

fn default_ram_threshold() -> f32 {
    90.0
}

fn default_disk_threshold() -> f32 {
    95.0
}

fn default_cooldown_secs() -> u64 {
    1800
}

fn default_sample_interval_secs() -> u64 {
    60
}

fn default_missing_retry_secs() -> u64 {
    60
}

fn default_read_error_retry_secs() -> u64 {
    10
}

fn default_send_delay_ms() -> u64 {
    100
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|_| anyhow::anyhow!("Invalid configuration file provided!"))
        .inspect(|config: &Config| trace!("loaded config: {config:?}"))
}
