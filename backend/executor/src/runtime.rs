//! Runtime wiring: builds the host pipeline, the dispatch engine and the
//! LLM-facing pieces from one config and keeps the pipeline running.

use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::info;

use cmdbridge_channels::{EnvelopeSynthesizer, PlatformRegistry};
use cmdbridge_commands::{build_pipeline, CommandDef, CommandDispatcher, CommandHandler, CommandRegistry};
use cmdbridge_config::BridgeConfig;
use cmdbridge_core::{CommandEnvelope, EventConsumer, EventQueue, ToolRegistry};

use crate::admin::{register_admin, AdminContext};
use crate::executor::CommandExecutor;
use crate::processor::CommandProcessor;
use crate::store::MappingStore;
use crate::tools::DynamicToolManager;
use crate::trigger::CommandTrigger;

pub struct BridgeRuntimeBuilder {
    config: BridgeConfig,
    platforms: PlatformRegistry,
    registry: CommandRegistry,
    dispatcher: CommandDispatcher,
    tools: Arc<RwLock<ToolRegistry>>,
}

impl BridgeRuntimeBuilder {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            platforms: PlatformRegistry::new(),
            registry: CommandRegistry::new(),
            dispatcher: CommandDispatcher::new(),
            tools: Arc::new(RwLock::new(ToolRegistry::new())),
        }
    }

    /// Use the host's platform registry instead of an empty one.
    pub fn platforms(mut self, platforms: PlatformRegistry) -> Self {
        self.platforms = platforms;
        self
    }

    /// Register dynamic tools into the host's tool table.
    pub fn tool_registry(mut self, tools: Arc<RwLock<ToolRegistry>>) -> Self {
        self.tools = tools;
        self
    }

    /// Add a host command.
    pub fn command(mut self, def: CommandDef, handler: Arc<dyn CommandHandler>) -> Self {
        self.dispatcher.register(def.key.clone(), handler);
        self.registry.register(def);
        self
    }

    /// Load the mapping store, register dynamic tools and start the pipeline.
    pub async fn start(self) -> BridgeRuntime {
        let Self {
            config,
            platforms,
            mut registry,
            mut dispatcher,
            tools,
        } = self;

        let mut queue = EventQueue::with_buffer_size(config.queue_capacity());
        let synthesizer = EnvelopeSynthesizer::with_self_id(platforms.clone(), config.self_id());
        let trigger = CommandTrigger::new(synthesizer.clone(), Arc::new(queue.submitter()))
            .with_timeout(config.dispatch_timeout());
        let executor = CommandExecutor::new(trigger);

        let store = Arc::new(MappingStore::load(config.mappings_path()).await);
        let wake_prefixes = config.wake_prefixes();
        let processor = Arc::new(
            CommandProcessor::new(store.clone(), executor.clone(), platforms.clone())
                .with_forwarding(config.forward_label(), config.forward_interval())
                .with_wake_prefix(wake_prefixes.first().map(String::as_str).unwrap_or("/")),
        );
        let tool_manager = Arc::new(DynamicToolManager::new(store.clone(), processor.clone(), tools));
        let registered = tool_manager.register_all().await;

        register_admin(
            &mut registry,
            &mut dispatcher,
            AdminContext {
                store: store.clone(),
                processor: processor.clone(),
                tools: tool_manager.clone(),
            },
        );
        let pipeline = build_pipeline(registry, dispatcher, wake_prefixes);

        let pipeline_task = match queue.take_rx() {
            Some(rx) => {
                info!(consumer = pipeline.name(), "Starting event consumer");
                Some(tokio::spawn(async move { pipeline.start(rx).await }))
            }
            None => None,
        };

        info!(
            mappings = store.len().await,
            tools = registered,
            timeout_ms = config.dispatch_timeout().as_millis() as u64,
            "Command bridge started"
        );

        BridgeRuntime {
            config,
            platforms,
            synthesizer,
            store,
            executor,
            processor,
            tools: tool_manager,
            pipeline_task,
        }
    }
}

pub struct BridgeRuntime {
    config: BridgeConfig,
    platforms: PlatformRegistry,
    synthesizer: EnvelopeSynthesizer,
    store: Arc<MappingStore>,
    executor: CommandExecutor,
    processor: Arc<CommandProcessor>,
    tools: Arc<DynamicToolManager>,
    pipeline_task: Option<JoinHandle<Result<()>>>,
}

impl BridgeRuntime {
    pub fn builder(config: BridgeConfig) -> BridgeRuntimeBuilder {
        BridgeRuntimeBuilder::new(config)
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn platforms(&self) -> &PlatformRegistry {
        &self.platforms
    }

    pub fn store(&self) -> &Arc<MappingStore> {
        &self.store
    }

    pub fn executor(&self) -> &CommandExecutor {
        &self.executor
    }

    pub fn processor(&self) -> &Arc<CommandProcessor> {
        &self.processor
    }

    pub fn tools(&self) -> &Arc<DynamicToolManager> {
        &self.tools
    }

    /// A chat event as the LLM layer would see it, for callers outside a
    /// real conversation (CLI, tests).
    pub async fn calling_event(
        &self,
        origin: &str,
        text: &str,
        sender_id: &str,
        sender_name: Option<&str>,
    ) -> CommandEnvelope {
        self.synthesizer.synthesize(origin, text, sender_id, sender_name).await
    }

    /// Run a mapped command on behalf of `event`.
    pub async fn execute(&self, event: &CommandEnvelope, command_name: &str, args: &str) -> String {
        self.processor.execute_command(event, command_name, args).await
    }

    /// Call a dynamic tool by function name.
    pub async fn call_tool(&self, function: &str, event: &CommandEnvelope, args: Value) -> Result<String> {
        self.tools.call(function, event, args).await
    }

    /// Stop the host pipeline. In-flight dispatches see a dropped event.
    pub fn shutdown(mut self) {
        if let Some(task) = self.pipeline_task.take() {
            task.abort();
        }
        info!("Command bridge stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cmdbridge_channels::LoopbackAdapter;
    use cmdbridge_commands::{reply, CommandCategory, CommandInvocation};

    struct Weather;

    #[async_trait]
    impl CommandHandler for Weather {
        async fn handle(&self, event: &CommandEnvelope, inv: &CommandInvocation) -> Result<()> {
            let named = inv.named_args();
            let city = named.get("city").map(String::as_str).unwrap_or("here");
            reply(event, format!("Sunny, 20C in {city}")).await
        }
    }

    const ORIGIN: &str = "telegram:GroupMessage:100_42";

    async fn runtime() -> (tempfile::TempDir, BridgeRuntime, Arc<LoopbackAdapter>) {
        runtime_with(BridgeConfig::default()).await
    }

    async fn runtime_with(config: BridgeConfig) -> (tempfile::TempDir, BridgeRuntime, Arc<LoopbackAdapter>) {
        let dir = tempfile::tempdir().unwrap();
        let config = BridgeConfig {
            data_dir: Some(dir.path().to_path_buf()),
            forward_interval_ms: Some(5),
            dispatch_timeout_ms: config.dispatch_timeout_ms.or(Some(2_000)),
            ..config
        };
        let platforms = PlatformRegistry::new();
        let adapter = LoopbackAdapter::new("telegram", "client");
        platforms.register(adapter.clone()).await;

        let runtime = BridgeRuntime::builder(config)
            .platforms(platforms)
            .command(
                CommandDef::new("weather", "Current weather", CommandCategory::Host),
                Arc::new(Weather),
            )
            .start()
            .await;
        (dir, runtime, adapter)
    }

    async fn admin(runtime: &BridgeRuntime, command: &str) -> String {
        let outcome = runtime.executor().execute_command(ORIGIN, command, "42", Some("alice")).await;
        assert!(outcome.success, "{command} failed");
        outcome.units.iter().filter_map(|u| u.plain_text()).collect::<Vec<_>>().join("\n")
    }

    #[tokio::test]
    async fn manage_mappings_and_call_the_tool() {
        let (dir, runtime, adapter) = runtime().await;

        assert_eq!(admin(&runtime, "/cmd2llm ls").await, "当前没有配置任何指令映射");
        assert_eq!(
            admin(&runtime, "/cmd2llm add weather get_weather 查询天气").await,
            "成功添加指令映射：'weather' -> 'get_weather'"
        );
        assert_eq!(
            admin(&runtime, "/cmd2llm add weather other").await,
            "指令 'weather' 已存在映射"
        );
        assert_eq!(runtime.tools().registered_functions().await, vec!["get_weather"]);
        assert!(dir.path().join("command_mappings.json").exists());

        let event = runtime.calling_event(ORIGIN, "what's the weather in Paris?", "42", Some("alice")).await;
        let out = runtime
            .call_tool("get_weather", &event, serde_json::json!({"args": "city=Paris"}))
            .await
            .unwrap();
        assert!(out.starts_with("指令执行结果：指令 'weather' 执行结果：\nSunny, 20C in Paris"));

        let sent = adapter.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chain.plain_text().unwrap(), "[指令执行] weather\nSunny, 20C in Paris");

        assert_eq!(
            admin(&runtime, "/cmd2llm ls").await,
            "当前配置的指令映射：\n1. weather -> get_weather (查询天气)\n"
        );
        runtime.shutdown();
    }

    #[tokio::test]
    async fn exec_and_remove_through_admin_commands() {
        let (_dir, runtime, _adapter) = runtime().await;
        admin(&runtime, "/cmd2llm add weather get_weather").await;

        assert_eq!(
            admin(&runtime, "/cmd2llm exec weather city=Oslo").await,
            "指令 'weather' 执行结果：\nSunny, 20C in Oslo"
        );
        assert_eq!(admin(&runtime, "/cmd2llm rm weather").await, "成功删除指令映射：'weather'");
        assert_eq!(
            admin(&runtime, "/cmd2llm rm weather").await,
            "错误：指令 'weather' 不存在映射"
        );
        assert!(runtime.tools().registered_functions().await.is_empty());
        assert_eq!(admin(&runtime, "/cmd2llm refresh").await, "刷新完成，当前注册了 0 个动态LLM函数");
    }

    #[tokio::test]
    async fn multi_level_names_use_double_dash() {
        let (_dir, runtime, _adapter) = runtime().await;
        admin(&runtime, "/cmd2llm add rmd--ls list_reminders 列出所有提醒").await;
        assert!(runtime.store().get("rmd ls").await.is_some());
    }

    #[tokio::test]
    async fn mappings_survive_restart() {
        let (dir, runtime, _adapter) = runtime().await;
        admin(&runtime, "/cmd2llm add weather get_weather").await;
        runtime.shutdown();

        let restarted = BridgeRuntime::builder(BridgeConfig {
            data_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        })
        .start()
        .await;
        assert_eq!(restarted.tools().registered_functions().await, vec!["get_weather"]);
        restarted.shutdown();
    }

    #[tokio::test]
    async fn mapped_commands_use_the_configured_wake_prefix() {
        let (_dir, runtime, adapter) = runtime_with(BridgeConfig {
            wake_prefixes: Some(vec!["!".to_string()]),
            ..Default::default()
        })
        .await;
        runtime.store().add("weather", "get_weather", "").await.unwrap();

        let event = runtime.calling_event(ORIGIN, "weather?", "42", Some("alice")).await;
        assert!(!event.is_generic());
        assert_eq!(
            runtime.execute(&event, "weather", "city=Paris").await,
            "指令 'weather' 执行结果：\nSunny, 20C in Paris"
        );
        assert_eq!(adapter.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn zero_capacity_and_timeout_fall_back_to_defaults() {
        let (_dir, runtime, _adapter) = runtime_with(BridgeConfig {
            queue_capacity: Some(0),
            dispatch_timeout_ms: Some(0),
            ..Default::default()
        })
        .await;
        runtime.store().add("weather", "get_weather", "").await.unwrap();

        let event = runtime.calling_event(ORIGIN, "weather?", "42", None).await;
        assert_eq!(
            runtime.execute(&event, "weather", "").await,
            "指令 'weather' 执行结果：\nSunny, 20C in here"
        );
    }
}
