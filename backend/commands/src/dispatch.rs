/// Command dispatch: route detected commands to handler objects.
///
/// Handlers reply by calling `send` on the event they were given; whatever
/// sink the event carries (live platform handle or capture buffer) receives
/// the reply.
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info};

use cmdbridge_core::CommandEnvelope;

use crate::types::CommandInvocation;

// ---------------------------------------------------------------------------
// Handler trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, event: &CommandEnvelope, inv: &CommandInvocation) -> Result<()>;
}

/// Send a single plain-text reply for `event`.
pub async fn reply(event: &CommandEnvelope, text: impl Into<String>) -> Result<()> {
    event.send(event.plain_result(text)).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct CommandDispatcher {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, key: impl Into<String>, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(key.into(), handler);
    }

    /// Run the handler for `inv`. Returns `Ok(false)` when no handler is
    /// registered for the command key.
    pub async fn dispatch(&self, event: &CommandEnvelope, inv: &CommandInvocation) -> Result<bool> {
        match self.handlers.get(&inv.key) {
            Some(handler) => {
                info!(command = %inv.key, session = %event.session_id, "Dispatching command");
                handler.handle(event, inv).await?;
                Ok(true)
            }
            None => {
                debug!(command = %inv.key, "No handler registered");
                Ok(false)
            }
        }
    }
}
