//! Invocation processor: the LLM-facing entry point.
//!
//! Looks the command up in the mapping store, runs it through the capture
//! orchestrator on behalf of the calling event, re-delivers each captured
//! reply to the caller's conversation, and turns the replies into one text
//! result for the LLM.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use cmdbridge_channels::PlatformRegistry;
use cmdbridge_core::{CommandEnvelope, MessageChain};
use cmdbridge_logging::{DispatchEvent, EventLogger};

use crate::executor::CommandExecutor;
use crate::store::MappingStore;

/// Default pause between consecutive forwarded replies.
pub const DEFAULT_FORWARD_INTERVAL: Duration = Duration::from_millis(500);

/// Default label put in front of forwarded replies.
pub const DEFAULT_FORWARD_LABEL: &str = "[指令执行]";

pub struct CommandProcessor {
    store: Arc<MappingStore>,
    executor: CommandExecutor,
    platforms: PlatformRegistry,
    forward_label: String,
    forward_interval: Duration,
    wake_prefix: String,
}

impl CommandProcessor {
    pub fn new(store: Arc<MappingStore>, executor: CommandExecutor, platforms: PlatformRegistry) -> Self {
        Self {
            store,
            executor,
            platforms,
            forward_label: DEFAULT_FORWARD_LABEL.to_string(),
            forward_interval: DEFAULT_FORWARD_INTERVAL,
            wake_prefix: "/".to_string(),
        }
    }

    /// Prefix put in front of dispatched command text. Must be one the host
    /// pipeline wakes on, or platform envelopes are ignored as plain chat.
    pub fn with_wake_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.wake_prefix = prefix.into();
        self
    }

    pub fn with_forwarding(mut self, label: impl Into<String>, interval: Duration) -> Self {
        self.forward_label = label.into();
        self.forward_interval = interval;
        self
    }

    pub fn store(&self) -> &Arc<MappingStore> {
        &self.store
    }

    pub fn executor(&self) -> &CommandExecutor {
        &self.executor
    }

    /// Run the mapped command `command_name` for `event` and describe the
    /// outcome as text. Never fails; every failure is a message.
    pub async fn execute_command(&self, event: &CommandEnvelope, command_name: &str, args: &str) -> String {
        let Some(mapping) = self.store.get(command_name).await else {
            return format!(
                "错误：未找到指令 '{}' 的映射。请先使用 add_command_mapping 添加映射。",
                command_name
            );
        };
        info!(
            command = %command_name,
            function = %mapping.handler_function_name,
            "Executing mapped command"
        );

        let mut command_text = format!("{}{}", self.wake_prefix, command_name);
        if !args.is_empty() {
            command_text.push(' ');
            command_text.push_str(args);
        }

        let origin = &event.unified_msg_origin;
        let outcome = self
            .executor
            .execute_command(origin, &command_text, event.sender_id(), event.sender_name())
            .await;

        if !outcome.success {
            return format!("指令 '{}' 执行失败或超时", command_name);
        }

        self.forward(origin, command_name, &outcome.units).await;

        let lines: Vec<String> = outcome
            .units
            .iter()
            .filter_map(MessageChain::plain_text)
            .filter(|text| !text.is_empty())
            .collect();

        if lines.is_empty() {
            format!("指令 '{}' 执行成功，但未返回文本内容", command_name)
        } else {
            format!("指令 '{}' 执行结果：\n{}", command_name, lines.join("\n"))
        }
    }

    /// Send every captured reply to `origin`, labelled, in capture order,
    /// pausing between sends. A failed send is logged and skipped.
    async fn forward(&self, origin: &str, command_name: &str, units: &[MessageChain]) {
        if units.is_empty() {
            return;
        }

        let mut delivered = 0;
        for (i, unit) in units.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.forward_interval).await;
            }

            let chain = MessageChain::plain(format!("{} {}\n", self.forward_label, command_name))
                .extend(unit.chain.iter().cloned());

            match self.platforms.send_message(origin, &chain).await {
                Ok(true) => delivered += 1,
                Ok(false) => warn!(origin = %origin, unit = i + 1, "Forward skipped: platform not connected"),
                Err(e) => warn!(origin = %origin, unit = i + 1, error = %e, "Forward failed"),
            }
        }

        info!(command = %command_name, delivered, total = units.len(), "Captured replies forwarded");
        EventLogger::log_event(
            origin,
            DispatchEvent::Forwarded {
                command: command_name.to_string(),
                delivered,
                total: units.len(),
            },
        );
    }
}
