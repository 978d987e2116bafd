//! Config defaults: applies default values to a parsed config.

use crate::schema::{BridgeConfig, LoggingConfig};

pub const DEFAULT_DISPATCH_TIMEOUT_MS: u64 = 20_000;

pub const DEFAULT_FORWARD_INTERVAL_MS: u64 = 500;

pub const DEFAULT_WAKE_PREFIX: &str = "/";

pub const DEFAULT_FORWARD_LABEL: &str = "[指令执行]";

pub const DEFAULT_SELF_ID: &str = "command_to_llm";

pub const DEFAULT_MAPPINGS_FILE: &str = "command_mappings.json";

pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: BridgeConfig) -> BridgeConfig {
    let config = apply_dispatch_defaults(config);
    let config = apply_storage_defaults(config);
    apply_logging_defaults(config)
}

fn apply_dispatch_defaults(mut config: BridgeConfig) -> BridgeConfig {
    config.dispatch_timeout_ms.get_or_insert(DEFAULT_DISPATCH_TIMEOUT_MS);
    config.forward_interval_ms.get_or_insert(DEFAULT_FORWARD_INTERVAL_MS);
    config.queue_capacity.get_or_insert(DEFAULT_QUEUE_CAPACITY);
    config
        .wake_prefixes
        .get_or_insert_with(|| vec![DEFAULT_WAKE_PREFIX.to_string()]);
    config
        .forward_label
        .get_or_insert_with(|| DEFAULT_FORWARD_LABEL.to_string());
    config.self_id.get_or_insert_with(|| DEFAULT_SELF_ID.to_string());
    config
}

fn apply_storage_defaults(mut config: BridgeConfig) -> BridgeConfig {
    if config.data_dir.is_none() {
        config.data_dir = Some(crate::io::config_dir().join("data"));
    }
    config
        .mappings_file
        .get_or_insert_with(|| DEFAULT_MAPPINGS_FILE.to_string());
    config
}

fn apply_logging_defaults(mut config: BridgeConfig) -> BridgeConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    if logging.level.is_none() {
        logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    config
}
