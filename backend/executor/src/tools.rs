//! Dynamic LLM tools: one callable function per command mapping.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use cmdbridge_commands::build_command_string;
use cmdbridge_core::{CommandEnvelope, LlmTool, ToolRegistry};

use crate::processor::CommandProcessor;
use crate::store::MappingStore;

/// The LLM function standing in for one mapped command.
pub struct CommandTool {
    command_name: String,
    function_name: String,
    description: String,
    processor: Arc<CommandProcessor>,
}

impl CommandTool {
    pub fn new(
        command_name: impl Into<String>,
        function_name: impl Into<String>,
        description: &str,
        processor: Arc<CommandProcessor>,
    ) -> Self {
        let command_name = command_name.into();
        let mut full_description = format!("执行指令 '{}'", command_name);
        if !description.is_empty() {
            full_description.push_str(&format!("，{}", description));
        }
        Self {
            command_name,
            function_name: function_name.into(),
            description: full_description,
            processor,
        }
    }

    pub fn command_name(&self) -> &str {
        &self.command_name
    }
}

/// `args` may come as a plain string or as an object of named values.
fn args_to_string(args: Option<&Value>) -> Result<String> {
    Ok(match args {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Object(map)) => {
            let named: BTreeMap<String, String> = map
                .iter()
                .map(|(k, v)| {
                    let v = match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), v)
                })
                .collect();
            build_command_string("", &named).trim_start().to_string()
        }
        Some(other) => bail!("unsupported args value: {other}"),
    })
}

#[async_trait]
impl LlmTool for CommandTool {
    fn name(&self) -> &str {
        &self.function_name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command_text": {
                    "type": "string",
                    "description": format!("要执行的指令，固定值为 '{}'", self.command_name),
                },
                "args": {
                    "type": "string",
                    "description": "指令参数，可选",
                },
            },
        })
    }

    async fn call(&self, event: &CommandEnvelope, args: Value) -> Result<String> {
        // `command_text` is fixed to the mapped command whatever the model sent.
        let arg_text = args_to_string(args.get("args"))?;
        info!(function = %self.function_name, command = %self.command_name, args = %arg_text, "Dynamic tool called");

        let result = self
            .processor
            .execute_command(event, &self.command_name, &arg_text)
            .await;
        Ok(format!("指令执行结果：{}\n\n请基于以上结果生成回复。", result))
    }
}

/// Keeps the host's tool table in step with the mapping store.
pub struct DynamicToolManager {
    store: Arc<MappingStore>,
    processor: Arc<CommandProcessor>,
    tools: Arc<RwLock<ToolRegistry>>,
    registered: Mutex<BTreeSet<String>>,
}

impl DynamicToolManager {
    pub fn new(
        store: Arc<MappingStore>,
        processor: Arc<CommandProcessor>,
        tools: Arc<RwLock<ToolRegistry>>,
    ) -> Self {
        Self {
            store,
            processor,
            tools,
            registered: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn tools(&self) -> &Arc<RwLock<ToolRegistry>> {
        &self.tools
    }

    /// Register a tool for every mapping whose function is not registered
    /// yet. Returns how many were added.
    pub async fn register_all(&self) -> usize {
        let mut registered = self.registered.lock().await;
        let mut tools = self.tools.write().await;
        let mut added = 0;

        for (command_name, mapping) in self.store.list().await {
            let function = mapping.handler_function_name;
            if registered.contains(&function) {
                debug!(function = %function, command = %command_name, "Function already registered");
                continue;
            }
            tools.register(Arc::new(CommandTool::new(
                command_name.clone(),
                function.clone(),
                &mapping.description,
                self.processor.clone(),
            )));
            info!(function = %function, command = %command_name, "Dynamic tool registered");
            registered.insert(function);
            added += 1;
        }
        added
    }

    /// Remove one dynamic tool. `false` if it was not registered here.
    pub async fn unregister(&self, function: &str) -> bool {
        let mut registered = self.registered.lock().await;
        if !registered.remove(function) {
            return false;
        }
        self.tools.write().await.unregister(function);
        info!(function = %function, "Dynamic tool unregistered");
        true
    }

    /// Drop every dynamic tool and register them again from the store.
    /// Returns the number registered afterwards.
    pub async fn refresh(&self) -> usize {
        {
            let mut registered = self.registered.lock().await;
            let mut tools = self.tools.write().await;
            for function in registered.iter() {
                tools.unregister(function);
            }
            registered.clear();
        }
        let count = self.register_all().await;
        info!(registered = count, "Dynamic tools refreshed");
        count
    }

    /// Function names currently registered by this manager, sorted.
    pub async fn registered_functions(&self) -> Vec<String> {
        self.registered.lock().await.iter().cloned().collect()
    }

    /// Call a registered tool by function name on behalf of `event`.
    pub async fn call(&self, function: &str, event: &CommandEnvelope, args: Value) -> Result<String> {
        let tool = self.tools.read().await.get(function);
        match tool {
            Some(tool) => tool.call(event, args).await,
            None => bail!("Tool '{}' not found", function),
        }
    }
}
