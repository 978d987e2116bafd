//! Runtime configuration for the command bridge.
//!
//! Provides:
//! - Typed config schema (dispatch, forwarding, storage, logging)
//! - YAML loading
//! - `${ENV_VAR}` substitution
//! - Default value application
//! - Validation

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_config};
pub use schema::{BridgeConfig, LoggingConfig};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::Path;

/// Load, apply env substitution and defaults, then validate a config file.
///
/// This is the main entry point for loading a config at runtime. Warnings
/// are logged; any validation error is logged and fails the load.
pub async fn load_and_prepare(path: &Path) -> Result<BridgeConfig> {
    let raw_config = load_config(path).await?;

    let value: Value =
        serde_json::to_value(&raw_config).context("Failed to serialize config for processing")?;
    let value = resolve_env_vars(&value).context("Failed to resolve env vars in config")?;

    let config: BridgeConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;
    let config = apply_all_defaults(config);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if !report.is_valid() {
        let details: Vec<String> = report.errors.iter().map(|e| e.to_string()).collect();
        bail!("Invalid config {}: {}", path.display(), details.join("; "));
    }

    Ok(config)
}
