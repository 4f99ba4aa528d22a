pub mod actors;
pub mod config;
pub mod dispatch;
pub mod monitors;
pub mod parsers;
pub mod supervisor;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// External identity eligible to receive alerts. Owned by the embedding
/// application (bot, user directory); the core only ever reads it.
pub type RecipientId = i64;

/// Named class of alert used to filter which recipients receive which
/// messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCategory {
    /// CPU/RAM/disk threshold alerts.
    Resources,
    /// Successful SSH logins.
    Logins,
    /// fail2ban (or equivalent) ban events.
    Bans,
}

impl std::fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AlertCategory::Resources => "resources",
            AlertCategory::Logins => "logins",
            AlertCategory::Bans => "bans",
        };
        write!(f, "{name}")
    }
}

/// One host resource snapshot, produced fresh on every sampling tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MetricSample {
    pub cpu_pct: f32,
    pub ram_pct: f32,
    pub disk_pct: f32,
    pub timestamp: DateTime<Utc>,
}
