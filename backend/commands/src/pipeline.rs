/// Host command pipeline: the consumer side of the event queue.
///
/// Each queued event is handled on its own task: wake gating, command
/// detection, dispatch, then the event's completion signal is fired with the
/// handler's outcome. Handler errors and panics become failed outcomes; they
/// never take the pipeline down.
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use cmdbridge_core::{CommandEnvelope, EventConsumer, HandlingOutcome, QueuedEvent};

use crate::detection::detect_command;
use crate::dispatch::CommandDispatcher;
use crate::registry::CommandRegistry;

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[derive(Clone)]
pub struct CommandPipeline {
    registry: Arc<CommandRegistry>,
    dispatcher: Arc<CommandDispatcher>,
    wake_prefixes: Arc<Vec<String>>,
}

impl CommandPipeline {
    pub fn new(
        registry: Arc<CommandRegistry>,
        dispatcher: Arc<CommandDispatcher>,
        wake_prefixes: Vec<String>,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            wake_prefixes: Arc::new(wake_prefixes),
        }
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Handle one event to completion and report how it went.
    pub async fn handle_event(&self, event: &CommandEnvelope) -> HandlingOutcome {
        let Some(inv) = detect_command(&event.message_str, &self.wake_prefixes, event.is_wake, &self.registry)
        else {
            debug!(origin = %event.unified_msg_origin, "Event is not a known command");
            return Ok(());
        };

        match AssertUnwindSafe(self.dispatcher.dispatch(event, &inv)).catch_unwind().await {
            Ok(Ok(_)) => {
                debug!(command = %inv.key, replied = event.has_sent(), "Command handled");
                Ok(())
            }
            Ok(Err(e)) => {
                warn!(command = %inv.key, error = %e, "Command handler failed");
                Err(format!("{e:#}"))
            }
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                error!(command = %inv.key, panic = %msg, "Command handler panicked");
                Err(format!("handler panicked: {msg}"))
            }
        }
    }
}

#[async_trait]
impl EventConsumer for CommandPipeline {
    fn name(&self) -> &str {
        "command-pipeline"
    }

    async fn start(&self, mut rx: mpsc::Receiver<QueuedEvent>) -> Result<()> {
        info!(commands = self.registry.all().len(), "Command pipeline started");

        while let Some(event) = rx.recv().await {
            let (envelope, done) = event.into_parts();
            let pipeline = self.clone();
            tokio::spawn(async move {
                let outcome = pipeline.handle_event(&envelope).await;
                done.complete(outcome);
            });
        }

        info!("Command pipeline stopped");
        Ok(())
    }
}
