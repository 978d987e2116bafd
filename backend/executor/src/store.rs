//! Mapping store: command name → LLM function name, persisted as JSON.
//!
//! The in-memory table is authoritative. Every mutation rewrites the whole
//! file (temp file, then rename); a failed write is logged and the table
//! keeps the change. Concurrent writers are serialized by the table lock,
//! last writer wins.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use cmdbridge_commands::validate_mapping;
use cmdbridge_core::BridgeError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRecord {
    /// Older files call this field `llm_function`.
    #[serde(alias = "llm_function")]
    pub handler_function_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_at: String,
}

/// Why a store mutation was refused. The messages are shown to users as-is.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("参数验证失败: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("指令 '{0}' 已存在映射")]
    Duplicate(String),

    #[error("错误：指令 '{0}' 不存在映射")]
    NotFound(String),
}

pub struct MappingStore {
    path: PathBuf,
    mappings: RwLock<BTreeMap<String, MappingRecord>>,
}

impl MappingStore {
    /// Open the store backed by `path`.
    ///
    /// A missing file is an empty table. An unreadable or corrupt file is
    /// logged and also yields an empty table; the file is left untouched
    /// until the next mutation.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mappings = match read_table(&path).await {
            Ok(Some(table)) => {
                info!(path = %path.display(), mappings = table.len(), "Loaded command mappings");
                table
            }
            Ok(None) => {
                debug!(path = %path.display(), "No mapping file yet");
                BTreeMap::new()
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to load command mappings");
                BTreeMap::new()
            }
        };
        Self {
            path,
            mappings: RwLock::new(mappings),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add a mapping. Returns the user-facing success message.
    pub async fn add(
        &self,
        command_name: &str,
        function_name: &str,
        description: &str,
    ) -> Result<String, MappingError> {
        let errors = validate_mapping(command_name, function_name);
        if !errors.is_empty() {
            warn!(command = %command_name, ?errors, "Mapping rejected");
            return Err(MappingError::Validation(errors));
        }

        let mut mappings = self.mappings.write().await;
        if mappings.contains_key(command_name) {
            warn!(command = %command_name, "Mapping already exists");
            return Err(MappingError::Duplicate(command_name.to_string()));
        }

        mappings.insert(
            command_name.to_string(),
            MappingRecord {
                handler_function_name: function_name.to_string(),
                description: description.to_string(),
                created_at: Utc::now().to_rfc3339(),
            },
        );
        self.persist(&mappings).await;

        info!(command = %command_name, function = %function_name, "Mapping added");
        Ok(format!("成功添加指令映射：'{}' -> '{}'", command_name, function_name))
    }

    /// Remove a mapping. Returns the user-facing success message.
    pub async fn remove(&self, command_name: &str) -> Result<String, MappingError> {
        let mut mappings = self.mappings.write().await;
        if mappings.remove(command_name).is_none() {
            return Err(MappingError::NotFound(command_name.to_string()));
        }
        self.persist(&mappings).await;

        info!(command = %command_name, "Mapping removed");
        Ok(format!("成功删除指令映射：'{}'", command_name))
    }

    pub async fn get(&self, command_name: &str) -> Option<MappingRecord> {
        self.mappings.read().await.get(command_name).cloned()
    }

    /// Snapshot of every mapping, ordered by command name.
    pub async fn list(&self) -> BTreeMap<String, MappingRecord> {
        self.mappings.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.mappings.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.mappings.read().await.is_empty()
    }

    async fn persist(&self, mappings: &BTreeMap<String, MappingRecord>) {
        if let Err(e) = write_table(&self.path, mappings).await {
            error!(path = %self.path.display(), error = %e, "Failed to save command mappings");
        }
    }
}

async fn read_table(path: &Path) -> Result<Option<BTreeMap<String, MappingRecord>>, BridgeError> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .await
        .map_err(|e| BridgeError::Persistence(format!("read {}: {}", path.display(), e)))?;
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| BridgeError::Persistence(format!("parse {}: {}", path.display(), e)))
}

async fn write_table(path: &Path, mappings: &BTreeMap<String, MappingRecord>) -> Result<(), BridgeError> {
    let persistence = |what: &str, e: std::io::Error| BridgeError::Persistence(format!("{what}: {e}"));

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| persistence("create data dir", e))?;
    }

    let json = serde_json::to_string_pretty(mappings)
        .map_err(|e| BridgeError::Persistence(format!("serialize: {e}")))?;

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| persistence("write temp file", e))?;
    fs::rename(&tmp_path, path)
        .await
        .map_err(|e| persistence("rename temp file", e))?;

    debug!(path = %path.display(), mappings = mappings.len(), "Saved command mappings");
    Ok(())
}
