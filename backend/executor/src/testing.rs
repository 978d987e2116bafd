//! Scripted host used by the executor tests.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use cmdbridge_channels::{EnvelopeSynthesizer, PlatformRegistry};
use cmdbridge_commands::{
    build_pipeline, reply, CommandCategory, CommandDef, CommandDispatcher, CommandHandler,
    CommandInvocation, CommandRegistry,
};
use cmdbridge_core::{
    CommandEnvelope, Component, EventConsumer, EventQueue, InboundMessage, MessageChain,
    PlatformMetadata, RoutingAddress,
};

use crate::trigger::CommandTrigger;

/// How long `/slow` sleeps before replying.
pub const SLOW: Duration = Duration::from_millis(1000);

const SCRIPTED: [&str; 7] = ["each", "silent", "raise", "slow", "weather", "image", "panic"];

/// One handler for every scripted command, switching on the key.
struct Script;

#[async_trait]
impl CommandHandler for Script {
    async fn handle(&self, event: &CommandEnvelope, inv: &CommandInvocation) -> Result<()> {
        match inv.key.as_str() {
            "each" => {
                for word in inv.raw_args.split_whitespace() {
                    reply(event, word).await?;
                }
                Ok(())
            }
            "silent" => Ok(()),
            "raise" => {
                reply(event, "partial").await?;
                anyhow::bail!("handler raised")
            }
            "slow" => {
                tokio::time::sleep(SLOW).await;
                reply(event, "late").await
            }
            "weather" => reply(event, "Sunny, 20C").await,
            "image" => {
                event
                    .send(MessageChain::new().push(Component::Image { file: "chart.png".into() }))
                    .await?;
                Ok(())
            }
            "panic" => panic!("scripted panic"),
            other => anyhow::bail!("unscripted command {other}"),
        }
    }
}

pub struct TestHost {
    pub trigger: CommandTrigger,
    pub platforms: PlatformRegistry,
}

/// A running host pipeline with the scripted commands registered, and a
/// trigger wired to it.
pub fn scripted_host(platforms: PlatformRegistry, timeout: Duration) -> TestHost {
    let mut registry = CommandRegistry::new();
    let mut dispatcher = CommandDispatcher::new();
    let script = Arc::new(Script);
    for key in SCRIPTED {
        registry.register(CommandDef::new(key, key, CommandCategory::Host));
        dispatcher.register(key, script.clone());
    }
    let pipeline = build_pipeline(registry, dispatcher, vec!["/".to_string()]);

    let mut queue = EventQueue::new();
    let rx = queue.take_rx().expect("fresh queue");
    tokio::spawn(async move { pipeline.start(rx).await });

    let trigger = CommandTrigger::new(EnvelopeSynthesizer::new(platforms.clone()), Arc::new(queue.submitter()))
        .with_timeout(timeout);
    TestHost { trigger, platforms }
}

/// The chat event an LLM function call would arrive with.
pub fn calling_event(origin: &str) -> CommandEnvelope {
    let address = RoutingAddress::parse(origin);
    let message = InboundMessage::synthetic(&address, "what's the weather?", "bot", "42", Some("alice"));
    let meta = PlatformMetadata::new(address.platform.clone(), "chat");
    CommandEnvelope::generic(address, message, meta)
}
