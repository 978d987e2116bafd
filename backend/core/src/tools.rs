use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::envelope::CommandEnvelope;

/// A function the LLM layer can call while handling a chat event.
#[async_trait]
pub trait LlmTool: Send + Sync {
    /// Function name exposed to the LLM (e.g. "get_weather").
    fn name(&self) -> &str;

    /// Description for the LLM prompt.
    fn description(&self) -> &str;

    /// JSON Schema for the function's parameters.
    fn parameters(&self) -> serde_json::Value;

    /// Run the function on behalf of `event`.
    async fn call(&self, event: &CommandEnvelope, args: serde_json::Value) -> Result<String>;
}

/// The host's table of LLM-callable functions.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn LlmTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn LlmTool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.tools.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn LlmTool>> {
        self.tools.get(name).cloned()
    }

    /// Registered function names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }
}
