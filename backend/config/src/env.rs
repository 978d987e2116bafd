//! `${VAR}` substitution in config string values.
//!
//! Only uppercase `[A-Z_][A-Z0-9_]*` names are recognised. `$${VAR}` is an
//! escape and yields the literal text `${VAR}`.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;

/// Matches both `${VAR}` and its escaped form `$${VAR}`.
static ENV_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\$?)\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid env var pattern"));

#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references using the process environment.
pub fn resolve_env_vars(value: &Value) -> Result<Value, MissingEnvVarError> {
    resolve_env_vars_with(value, &std::env::vars().collect())
}

/// Substitute `${VAR}` references using `env`. A missing or empty variable
/// is an error naming the config path that referenced it.
pub fn resolve_env_vars_with(
    value: &Value,
    env: &HashMap<String, String>,
) -> Result<Value, MissingEnvVarError> {
    walk(value, env, "")
}

fn walk(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value, MissingEnvVarError> {
    Ok(match value {
        Value::String(s) => Value::String(substitute(s, env, path)?),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, v)| walk(v, env, &format!("{path}[{i}]")))
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, v) in map {
                let child = if path.is_empty() { key.clone() } else { format!("{path}.{key}") };
                out.insert(key.clone(), walk(v, env, &child)?);
            }
            Value::Object(out)
        }
        other => other.clone(),
    })
}

fn substitute(s: &str, env: &HashMap<String, String>, path: &str) -> Result<String, MissingEnvVarError> {
    if !s.contains("${") {
        return Ok(s.to_string());
    }

    let mut missing = None;
    let out = ENV_REF.replace_all(s, |caps: &Captures| {
        let name = &caps[2];
        if !caps[1].is_empty() {
            return format!("${{{name}}}");
        }
        match env.get(name).filter(|v| !v.is_empty()) {
            Some(v) => v.clone(),
            None => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(var_name) => Err(MissingEnvVarError {
            var_name,
            config_path: path.to_string(),
        }),
        None => Ok(out.into_owned()),
    }
}
