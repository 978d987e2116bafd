use std::time::Duration;

use thiserror::Error;

/// Top-level error type for the command bridge.
///
/// None of these escape the public bridge operations: the capture engine and
/// the orchestrator turn them into a failed outcome plus a log entry.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("platform '{platform}' unavailable: {reason}")]
    AdapterUnavailable { platform: String, reason: String },

    #[error("dispatch timed out after {0:?}")]
    DispatchTimeout(Duration),

    #[error("dispatch failed: {0}")]
    DispatchFailed(String),

    #[error("channel closed: {0}")]
    ChannelClosed(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BridgeError {
    pub fn adapter_unavailable(platform: impl Into<String>, reason: impl Into<String>) -> Self {
        BridgeError::AdapterUnavailable {
            platform: platform.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_unavailable_names_platform() {
        let err = BridgeError::adapter_unavailable("telegram", "not connected");
        assert_eq!(err.to_string(), "platform 'telegram' unavailable: not connected");
    }

    #[test]
    fn anyhow_errors_convert_transparently() {
        let err: BridgeError = anyhow::anyhow!("handler exploded").into();
        assert_eq!(err.to_string(), "handler exploded");
    }
}
