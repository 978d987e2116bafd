//! Bridge runtime configuration schema.
//!
//! Every field is optional in the file; `defaults::apply_all_defaults` fills
//! the gaps and the accessors below fall back to the same defaults, so a
//! config that skipped the defaults pass still behaves.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::defaults::{
    DEFAULT_DISPATCH_TIMEOUT_MS, DEFAULT_FORWARD_INTERVAL_MS, DEFAULT_FORWARD_LABEL,
    DEFAULT_LOG_LEVEL, DEFAULT_MAPPINGS_FILE, DEFAULT_QUEUE_CAPACITY, DEFAULT_SELF_ID,
    DEFAULT_WAKE_PREFIX,
};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    /// How long a dispatch may wait for the host to finish handling it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispatch_timeout_ms: Option<u64>,

    /// Pause between consecutive forwarded replies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward_interval_ms: Option<u64>,

    /// Prefixes that address a message to the bot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wake_prefixes: Option<Vec<String>>,

    /// Label put in front of every forwarded reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward_label: Option<String>,

    /// Self id stamped on synthesized events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_id: Option<String>,

    /// Directory holding the mapping table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mappings_file: Option<String>,

    /// Capacity of the host event queue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_capacity: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for daily NDJSON log files; console only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Resolved accessors
// ---------------------------------------------------------------------------

impl BridgeConfig {
    /// Zero would time out every dispatch, so it reads as unset.
    pub fn dispatch_timeout(&self) -> Duration {
        let ms = self
            .dispatch_timeout_ms
            .filter(|&ms| ms > 0)
            .unwrap_or(DEFAULT_DISPATCH_TIMEOUT_MS);
        Duration::from_millis(ms)
    }

    pub fn forward_interval(&self) -> Duration {
        Duration::from_millis(self.forward_interval_ms.unwrap_or(DEFAULT_FORWARD_INTERVAL_MS))
    }

    pub fn wake_prefixes(&self) -> Vec<String> {
        self.wake_prefixes
            .clone()
            .unwrap_or_else(|| vec![DEFAULT_WAKE_PREFIX.to_string()])
    }

    pub fn forward_label(&self) -> &str {
        self.forward_label.as_deref().unwrap_or(DEFAULT_FORWARD_LABEL)
    }

    pub fn self_id(&self) -> &str {
        self.self_id.as_deref().unwrap_or(DEFAULT_SELF_ID)
    }

    /// A bounded queue needs room for at least one event; zero reads as unset.
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
            .filter(|&capacity| capacity > 0)
            .unwrap_or(DEFAULT_QUEUE_CAPACITY)
    }

    /// Data directory; `<config dir>/data` when unset.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| crate::io::config_dir().join("data"))
    }

    /// Full path of the mapping table file.
    pub fn mappings_path(&self) -> PathBuf {
        self.data_dir()
            .join(self.mappings_file.as_deref().unwrap_or(DEFAULT_MAPPINGS_FILE))
    }

    pub fn log_level(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        self.logging.as_ref().and_then(|l| l.dir.clone())
    }
}
