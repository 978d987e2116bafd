/// Built-in command handlers.
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use cmdbridge_core::{CommandEnvelope, DEFAULT_SENDER_NAME};

use crate::dispatch::{reply, CommandHandler};
use crate::registry::CommandRegistry;
use crate::types::CommandInvocation;

// ---------------------------------------------------------------------------
// /help
// ---------------------------------------------------------------------------

pub struct HelpHandler {
    pub registry: Arc<CommandRegistry>,
    /// Prefix shown in front of every alias.
    pub wake_prefix: String,
}

#[async_trait]
impl CommandHandler for HelpHandler {
    async fn handle(&self, event: &CommandEnvelope, _inv: &CommandInvocation) -> Result<()> {
        let mut lines = vec!["Available commands:".to_string()];
        for cmd in self.registry.all() {
            lines.push(format!("• {}{}: {}", self.wake_prefix, cmd.usage(), cmd.description));
        }
        reply(event, lines.join("\n")).await
    }
}

// ---------------------------------------------------------------------------
// /whoami
// ---------------------------------------------------------------------------

pub struct WhoAmIHandler;

#[async_trait]
impl CommandHandler for WhoAmIHandler {
    async fn handle(&self, event: &CommandEnvelope, _inv: &CommandInvocation) -> Result<()> {
        let name = event.sender_name().unwrap_or(DEFAULT_SENDER_NAME);
        reply(
            event,
            format!("{} ({}) on {}", name, event.sender_id(), event.unified_msg_origin),
        )
        .await
    }
}
