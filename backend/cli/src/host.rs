//! Demo host: loopback adapters for every supported platform plus a few
//! host commands, so the bridge can be exercised from a terminal.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use cmdbridge_channels::{HandleShape, LoopbackAdapter, PlatformRegistry, PLATFORM_VARIANTS};
use cmdbridge_commands::{reply, CommandArg, CommandCategory, CommandDef, CommandHandler, CommandInvocation};
use cmdbridge_core::{CommandEnvelope, Component, MessageChain};
use cmdbridge_executor::BridgeRuntimeBuilder;

/// Loopback adapters keyed the way each platform exposes its client.
pub async fn demo_platforms() -> (PlatformRegistry, Vec<Arc<LoopbackAdapter>>) {
    let registry = PlatformRegistry::new();
    let mut adapters = Vec::new();
    for variant in PLATFORM_VARIANTS {
        let attribute = match variant.shape {
            HandleShape::Attribute(attr) => attr,
            HandleShape::Adapter | HandleShape::Detached => "adapter",
        };
        let adapter = LoopbackAdapter::new(variant.id, attribute);
        registry.register(adapter.clone()).await;
        adapters.push(adapter);
    }
    (registry, adapters)
}

/// Add the demo host commands to a runtime builder.
pub fn with_demo_commands(builder: BridgeRuntimeBuilder) -> BridgeRuntimeBuilder {
    builder
        .command(
            CommandDef::new("echo", "Repeat the arguments", CommandCategory::Host)
                .with_arg(CommandArg::remaining("text", "Text to repeat")),
            Arc::new(Echo),
        )
        .command(
            CommandDef::new("ping", "Reply twice: pong, then a card", CommandCategory::Host),
            Arc::new(Ping),
        )
        .command(
            CommandDef::new("remind", "Set a reminder: remind time=10:00 <text>", CommandCategory::Host)
                .with_arg(CommandArg::remaining("args", "time=HH:MM and the reminder text")),
            Arc::new(Remind),
        )
}

struct Remind;

#[async_trait]
impl CommandHandler for Remind {
    async fn handle(&self, event: &CommandEnvelope, inv: &CommandInvocation) -> Result<()> {
        let named = inv.named_args();
        let (Some(time), Some(text)) = (named.get("time"), named.get("text")) else {
            return reply(event, "usage: remind time=HH:MM <text>").await;
        };
        reply(event, format!("Reminder set for {time}: {text}")).await
    }
}

struct Echo;

#[async_trait]
impl CommandHandler for Echo {
    async fn handle(&self, event: &CommandEnvelope, inv: &CommandInvocation) -> Result<()> {
        if inv.raw_args.is_empty() {
            return reply(event, "(nothing to echo)").await;
        }
        reply(event, inv.raw_args.clone()).await
    }
}

struct Ping;

#[async_trait]
impl CommandHandler for Ping {
    async fn handle(&self, event: &CommandEnvelope, _inv: &CommandInvocation) -> Result<()> {
        reply(event, "pong").await?;
        let card = MessageChain::plain(format!("from {}", event.sender_id()))
            .push(Component::Image {
                file: "https://example.invalid/pong.png".to_string(),
            });
        event.send(card).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_platform_gets_a_loopback() {
        let (registry, adapters) = demo_platforms().await;
        assert_eq!(adapters.len(), PLATFORM_VARIANTS.len());
        assert_eq!(registry.platform_ids().await.len(), PLATFORM_VARIANTS.len());
    }

    #[tokio::test]
    async fn remind_reads_named_arguments() {
        let (platforms, _adapters) = demo_platforms().await;
        let dir = tempfile::tempdir().unwrap();
        let config = cmdbridge_config::BridgeConfig {
            data_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let runtime = with_demo_commands(cmdbridge_executor::BridgeRuntime::builder(config).platforms(platforms))
            .start()
            .await;

        let outcome = runtime
            .executor()
            .execute_command("slack:FriendMessage:U1", "/remind drink water time=10:00", "U1", None)
            .await;
        assert!(outcome.success);
        assert_eq!(outcome.units[0].plain_text().unwrap(), "Reminder set for 10:00: drink water");
        runtime.shutdown();
    }
}
