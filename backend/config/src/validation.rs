//! Config validation with path-addressed errors and warnings.

use crate::schema::BridgeConfig;
use thiserror::Error;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &BridgeConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_dispatch(config, &mut report);
    validate_wake_prefixes(config, &mut report);
    validate_storage(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn validate_dispatch(config: &BridgeConfig, report: &mut ValidationReport) {
    if config.dispatch_timeout_ms == Some(0) {
        report.error("dispatchTimeoutMs", "dispatchTimeoutMs must be > 0");
    }
    if let Some(interval) = config.forward_interval_ms {
        if interval > 60_000 {
            report.warn(
                "forwardIntervalMs",
                format!("Forward interval of {interval} ms delays multi-reply commands by minutes"),
            );
        }
    }
    if config.queue_capacity == Some(0) {
        report.error("queueCapacity", "queueCapacity must be >= 1");
    }
    if config.self_id.as_deref().is_some_and(|s| s.trim().is_empty()) {
        report.error("selfId", "selfId cannot be empty");
    }
}

fn validate_wake_prefixes(config: &BridgeConfig, report: &mut ValidationReport) {
    let Some(prefixes) = &config.wake_prefixes else { return };
    if prefixes.is_empty() {
        report.warn(
            "wakePrefixes",
            "No wake prefixes; only pre-woken events will reach command handlers",
        );
    }
    for (i, prefix) in prefixes.iter().enumerate() {
        if prefix.is_empty() {
            report.error(format!("wakePrefixes[{i}]"), "Wake prefix cannot be empty");
        }
    }
}

fn validate_storage(config: &BridgeConfig, report: &mut ValidationReport) {
    if config.mappings_file.as_deref().is_some_and(|f| f.trim().is_empty()) {
        report.error("mappingsFile", "mappingsFile cannot be empty");
    }
}

fn validate_logging(config: &BridgeConfig, report: &mut ValidationReport) {
    let Some(level) = config.logging.as_ref().and_then(|l| l.level.as_deref()) else {
        return;
    };
    if !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
        report.warn(
            "logging.level",
            format!("Unknown log level '{level}'. Use one of: {}", LOG_LEVELS.join(", ")),
        );
    }
}
