//! `/cmd2llm ...` management commands.
//!
//! Registered into the host pipeline like any other command. Command names
//! typed here may use `--` for spaces (`rmd--ls` is `rmd ls`).

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use cmdbridge_commands::{
    reply, CommandArg, CommandCategory, CommandDef, CommandDispatcher, CommandHandler,
    CommandInvocation, CommandRegistry,
};
use cmdbridge_core::CommandEnvelope;

use crate::processor::CommandProcessor;
use crate::store::MappingStore;
use crate::tools::DynamicToolManager;

pub const ADMIN_GROUP: &str = "cmd2llm";

const HELP_TEXT: &str = "指令转LLM帮助：

/cmd2llm add <指令名> <LLM函数名> [描述] - 添加指令映射
/cmd2llm ls - 列出所有指令映射
/cmd2llm rm <指令名> - 删除指令映射
/cmd2llm exec <指令名> [参数] - 执行指令
/cmd2llm refresh - 刷新动态LLM函数
/cmd2llm help - 显示此帮助

指令名格式：
- 单个指令：rmd
- 多级指令：rmd--ls, rmd--add（-- 会替换为空格）

示例：
/cmd2llm add rmd--ls list_reminders 列出所有提醒
/cmd2llm exec rmd--add text=喝水 time=10:00";

/// `rmd--ls` ⇒ `rmd ls`.
pub fn decode_command_name(raw: &str) -> String {
    raw.replace("--", " ")
}

/// Shared state every management handler works on.
#[derive(Clone)]
pub struct AdminContext {
    pub store: Arc<MappingStore>,
    pub processor: Arc<CommandProcessor>,
    pub tools: Arc<DynamicToolManager>,
}

/// Definitions of the management commands.
pub fn admin_commands() -> Vec<CommandDef> {
    let def = |sub: &str, description: &str| {
        CommandDef::new(format!("{ADMIN_GROUP} {sub}"), description, CommandCategory::Bridge)
    };
    vec![
        def("add", "添加指令映射")
            .with_arg(CommandArg::required("name", "指令名"))
            .with_arg(CommandArg::required("function", "LLM函数名"))
            .with_arg(CommandArg::remaining("description", "描述")),
        def("ls", "列出所有指令映射"),
        def("rm", "删除指令映射").with_arg(CommandArg::required("name", "指令名")),
        def("exec", "执行指令")
            .with_arg(CommandArg::required("name", "指令名"))
            .with_arg(CommandArg::remaining("args", "参数")),
        def("refresh", "刷新动态LLM函数"),
        def("help", "显示帮助"),
    ]
}

/// Register every management command and its handler.
pub fn register_admin(registry: &mut CommandRegistry, dispatcher: &mut CommandDispatcher, ctx: AdminContext) {
    for def in admin_commands() {
        registry.register(def);
    }
    let handler = |sub: &str| format!("{ADMIN_GROUP} {sub}");
    dispatcher.register(handler("add"), Arc::new(AddMapping(ctx.clone())));
    dispatcher.register(handler("ls"), Arc::new(ListMappings(ctx.clone())));
    dispatcher.register(handler("rm"), Arc::new(RemoveMapping(ctx.clone())));
    dispatcher.register(handler("exec"), Arc::new(ExecMapping(ctx.clone())));
    dispatcher.register(handler("refresh"), Arc::new(RefreshTools(ctx)));
    dispatcher.register(handler("help"), Arc::new(AdminHelp));
}

// ---------------------------------------------------------------------------
// add
// ---------------------------------------------------------------------------

struct AddMapping(AdminContext);

#[async_trait]
impl CommandHandler for AddMapping {
    async fn handle(&self, event: &CommandEnvelope, inv: &CommandInvocation) -> Result<()> {
        let (Some(name), Some(function)) = (inv.arg(0), inv.arg(1)) else {
            return reply(event, "用法：/cmd2llm add <指令名> <LLM函数名> [描述]").await;
        };
        let name = decode_command_name(name);
        let description = inv.arg(2).unwrap_or("");
        info!(command = %name, function = %function, "Adding mapping");

        match self.0.store.add(&name, function, description).await {
            Ok(msg) => {
                self.0.tools.refresh().await;
                reply(event, msg).await
            }
            Err(e) => reply(event, e.to_string()).await,
        }
    }
}

// ---------------------------------------------------------------------------
// ls
// ---------------------------------------------------------------------------

struct ListMappings(AdminContext);

#[async_trait]
impl CommandHandler for ListMappings {
    async fn handle(&self, event: &CommandEnvelope, _inv: &CommandInvocation) -> Result<()> {
        let mappings = self.0.store.list().await;
        if mappings.is_empty() {
            return reply(event, "当前没有配置任何指令映射").await;
        }

        let mut text = String::from("当前配置的指令映射：\n");
        for (i, (command, mapping)) in mappings.iter().enumerate() {
            text.push_str(&format!("{}. {} -> {}", i + 1, command, mapping.handler_function_name));
            if !mapping.description.is_empty() {
                text.push_str(&format!(" ({})", mapping.description));
            }
            text.push('\n');
        }
        reply(event, text).await
    }
}

// ---------------------------------------------------------------------------
// rm
// ---------------------------------------------------------------------------

struct RemoveMapping(AdminContext);

#[async_trait]
impl CommandHandler for RemoveMapping {
    async fn handle(&self, event: &CommandEnvelope, inv: &CommandInvocation) -> Result<()> {
        let Some(name) = inv.arg(0) else {
            return reply(event, "用法：/cmd2llm rm <指令名>").await;
        };
        match self.0.store.remove(&decode_command_name(name)).await {
            Ok(msg) => {
                self.0.tools.refresh().await;
                reply(event, msg).await
            }
            Err(e) => reply(event, e.to_string()).await,
        }
    }
}

// ---------------------------------------------------------------------------
// exec
// ---------------------------------------------------------------------------

struct ExecMapping(AdminContext);

#[async_trait]
impl CommandHandler for ExecMapping {
    async fn handle(&self, event: &CommandEnvelope, inv: &CommandInvocation) -> Result<()> {
        let Some(name) = inv.arg(0) else {
            return reply(event, "用法：/cmd2llm exec <指令名> [参数]").await;
        };
        let result = self
            .0
            .processor
            .execute_command(event, &decode_command_name(name), inv.arg(1).unwrap_or(""))
            .await;
        reply(event, result).await
    }
}

// ---------------------------------------------------------------------------
// refresh / help
// ---------------------------------------------------------------------------

struct RefreshTools(AdminContext);

#[async_trait]
impl CommandHandler for RefreshTools {
    async fn handle(&self, event: &CommandEnvelope, _inv: &CommandInvocation) -> Result<()> {
        let count = self.0.tools.refresh().await;
        reply(event, format!("刷新完成，当前注册了 {} 个动态LLM函数", count)).await
    }
}

struct AdminHelp;

#[async_trait]
impl CommandHandler for AdminHelp {
    async fn handle(&self, event: &CommandEnvelope, _inv: &CommandInvocation) -> Result<()> {
        reply(event, HELP_TEXT).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_dash_becomes_space() {
        assert_eq!(decode_command_name("rmd--ls"), "rmd ls");
        assert_eq!(decode_command_name("a--b--c"), "a b c");
        assert_eq!(decode_command_name("weather"), "weather");
    }

    #[test]
    fn every_admin_command_is_grouped() {
        let defs = admin_commands();
        assert_eq!(defs.len(), 6);
        assert!(defs.iter().all(|d| d.key.starts_with("cmd2llm ")));
        let add = defs.iter().find(|d| d.key == "cmd2llm add").unwrap();
        assert_eq!(add.usage(), "cmd2llm add <name> <function> [description]");
    }
}
