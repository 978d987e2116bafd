//! Capture orchestrator: the containment seam around the engine.
//!
//! Nothing raised in synthesis, dispatch or capture escapes; errors and
//! panics are logged with their cause chain and turned into a failed
//! outcome.

use std::error::Error;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::error;

use cmdbridge_commands::panic_message;

use crate::trigger::{CaptureOutcome, CommandTrigger};

/// `"outer: inner: root"` for an error and all of its sources.
pub fn cause_chain(err: &(dyn Error + 'static)) -> String {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}

#[derive(Clone)]
pub struct CommandExecutor {
    trigger: CommandTrigger,
}

impl CommandExecutor {
    pub fn new(trigger: CommandTrigger) -> Self {
        Self { trigger }
    }

    pub fn trigger(&self) -> &CommandTrigger {
        &self.trigger
    }

    /// Run `command` in the conversation at `origin` and capture its replies.
    pub async fn execute_command(
        &self,
        origin: &str,
        command: &str,
        sender_id: &str,
        sender_name: Option<&str>,
    ) -> CaptureOutcome {
        let run = self.trigger.trigger_and_capture(origin, command, sender_id, sender_name);
        match AssertUnwindSafe(run).catch_unwind().await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!(command = %command, origin = %origin, error = %cause_chain(&e), "Command execution failed");
                CaptureOutcome::failed()
            }
            Err(payload) => {
                error!(command = %command, origin = %origin, panic = %panic_message(payload.as_ref()), "Command execution panicked");
                CaptureOutcome::failed()
            }
        }
    }

    /// Run `command` with replies delivered live. `false` on any failure.
    pub async fn execute_and_forward(
        &self,
        origin: &str,
        command: &str,
        sender_id: &str,
        sender_name: Option<&str>,
    ) -> bool {
        let run = self.trigger.trigger_and_forward(origin, command, sender_id, sender_name);
        match AssertUnwindSafe(run).catch_unwind().await {
            Ok(Ok(done)) => done,
            Ok(Err(e)) => {
                error!(command = %command, origin = %origin, error = %cause_chain(&e), "Command forwarding failed");
                false
            }
            Err(payload) => {
                error!(command = %command, origin = %origin, panic = %panic_message(payload.as_ref()), "Command forwarding panicked");
                false
            }
        }
    }
}
