//! Dispatch & capture engine.
//!
//! Synthesizes an envelope for the target conversation, redirects its
//! replies into a buffer owned by this one dispatch, submits it through the
//! host's event queue and waits (bounded) for the host to finish.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{info, warn};

use cmdbridge_channels::EnvelopeSynthesizer;
use cmdbridge_core::{BridgeError, CommandEnvelope, EventSubmitter, MessageChain};
use cmdbridge_logging::{DispatchEvent, EventLogger};

/// Default bound on waiting for the host to handle a dispatched command.
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Result of a captured dispatch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureOutcome {
    pub success: bool,
    /// Replies in the order the handler sent them.
    pub units: Vec<MessageChain>,
}

impl CaptureOutcome {
    pub fn failed() -> Self {
        Self::default()
    }

    pub fn captured(units: Vec<MessageChain>) -> Self {
        Self { success: true, units }
    }
}

#[derive(Clone)]
pub struct CommandTrigger {
    synthesizer: EnvelopeSynthesizer,
    submitter: Arc<dyn EventSubmitter>,
    timeout: Duration,
}

impl CommandTrigger {
    pub fn new(synthesizer: EnvelopeSynthesizer, submitter: Arc<dyn EventSubmitter>) -> Self {
        Self {
            synthesizer,
            submitter,
            timeout: DEFAULT_DISPATCH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Dispatch `command` into the conversation at `origin` and collect
    /// every reply the handler sends.
    ///
    /// Timeouts and handling failures are `Ok((false, []))`; any partial
    /// buffer is discarded. Only an empty command is an error.
    pub async fn trigger_and_capture(
        &self,
        origin: &str,
        command: &str,
        sender_id: &str,
        sender_name: Option<&str>,
    ) -> Result<CaptureOutcome, BridgeError> {
        let mut envelope = self.envelope(origin, command, sender_id, sender_name).await?;
        let buffer = envelope.capture_replies();

        if !self.submit_and_wait(origin, command, envelope).await {
            return Ok(CaptureOutcome::failed());
        }

        let units = buffer.take().await;
        info!(command = %command, units = units.len(), "Command output captured");
        EventLogger::log_event(
            origin,
            DispatchEvent::Captured {
                command: command.to_string(),
                units: units.len(),
            },
        );
        Ok(CaptureOutcome::captured(units))
    }

    /// Dispatch `command` with the envelope's live send path left in place:
    /// replies go straight to the platform (or are dropped when the envelope
    /// has no live handle). Returns whether the host finished in time.
    pub async fn trigger_and_forward(
        &self,
        origin: &str,
        command: &str,
        sender_id: &str,
        sender_name: Option<&str>,
    ) -> Result<bool, BridgeError> {
        let envelope = self.envelope(origin, command, sender_id, sender_name).await?;
        Ok(self.submit_and_wait(origin, command, envelope).await)
    }

    async fn envelope(
        &self,
        origin: &str,
        command: &str,
        sender_id: &str,
        sender_name: Option<&str>,
    ) -> Result<CommandEnvelope, BridgeError> {
        if command.trim().is_empty() {
            return Err(BridgeError::Validation("command text cannot be empty".to_string()));
        }
        Ok(self
            .synthesizer
            .synthesize(origin, command, sender_id, sender_name)
            .await)
    }

    async fn submit_and_wait(&self, origin: &str, command: &str, envelope: CommandEnvelope) -> bool {
        let generic = envelope.is_generic();
        info!(command = %command, origin = %origin, generic, "Submitting command");

        let completion = match self.submitter.submit(envelope).await {
            Ok(completion) => completion,
            Err(e) => return self.fail(origin, command, e),
        };
        EventLogger::log_event(
            origin,
            DispatchEvent::Submitted {
                command: command.to_string(),
                generic,
            },
        );

        match timeout(self.timeout, completion.wait()).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => self.fail(origin, command, e),
            Err(_) => self.fail(origin, command, BridgeError::DispatchTimeout(self.timeout)),
        }
    }

    fn fail(&self, origin: &str, command: &str, e: BridgeError) -> bool {
        warn!(command = %command, origin = %origin, error = %e, "Command dispatch failed");
        EventLogger::log_event(
            origin,
            DispatchEvent::Failed {
                command: command.to_string(),
                reason: e.to_string(),
            },
        );
        false
    }
}
