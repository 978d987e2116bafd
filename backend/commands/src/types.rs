/// Host command types.
///
/// Aliases are stored without the wake prefix; `"cmd2llm add"` is matched by
/// `/cmd2llm add ...` when `/` is a wake prefix.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::args::parse_command_args;

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandCategory {
    Status,
    /// Commands owned by the bridge itself (`cmd2llm ...`).
    Bridge,
    /// Commands registered by the embedding host.
    Host,
}

// ---------------------------------------------------------------------------
// Arg
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandArg {
    pub name: String,
    pub description: String,
    pub required: bool,
    /// If true, consumes all remaining text.
    pub capture_remaining: bool,
}

impl CommandArg {
    pub fn required(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required: true,
            capture_remaining: false,
        }
    }

    pub fn optional(name: &str, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, description)
        }
    }

    pub fn remaining(name: &str, description: &str) -> Self {
        Self {
            capture_remaining: true,
            ..Self::optional(name, description)
        }
    }
}

// ---------------------------------------------------------------------------
// Command definition
// ---------------------------------------------------------------------------

/// A command entry in the host registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandDef {
    /// Unique key the dispatcher routes on (e.g. "help", "cmd2llm add").
    pub key: String,
    pub description: String,
    pub category: CommandCategory,
    /// Text aliases without the wake prefix; may contain spaces.
    pub text_aliases: Vec<String>,
    pub args: Vec<CommandArg>,
}

impl CommandDef {
    /// A command whose only alias is its key.
    pub fn new(key: impl Into<String>, description: impl Into<String>, category: CommandCategory) -> Self {
        let key = key.into();
        Self {
            text_aliases: vec![key.clone()],
            key,
            description: description.into(),
            category,
            args: vec![],
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.text_aliases.push(alias.into());
        self
    }

    pub fn with_arg(mut self, arg: CommandArg) -> Self {
        self.args.push(arg);
        self
    }

    /// Primary alias (first in list), or key if none.
    pub fn primary_alias(&self) -> &str {
        self.text_aliases.first().map(|s| s.as_str()).unwrap_or(&self.key)
    }

    /// Usage line such as `cmd2llm rm <name>`.
    pub fn usage(&self) -> String {
        let mut usage = self.primary_alias().to_string();
        for arg in &self.args {
            if arg.required {
                usage.push_str(&format!(" <{}>", arg.name));
            } else {
                usage.push_str(&format!(" [{}]", arg.name));
            }
        }
        usage
    }
}

// ---------------------------------------------------------------------------
// Parsed invocation
// ---------------------------------------------------------------------------

/// A detected and parsed command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub key: String,
    /// The alias text as typed (without wake prefix).
    pub raw_alias: String,
    /// Positional arguments parsed from remaining text.
    pub args: Vec<String>,
    /// Full remaining text after the command name.
    pub raw_args: String,
}

impl CommandInvocation {
    /// Positional argument `i`, if given.
    pub fn arg(&self, i: usize) -> Option<&str> {
        self.args.get(i).map(|s| s.as_str())
    }

    /// The remaining text read as `key=value` tokens plus bare `text`.
    pub fn named_args(&self) -> BTreeMap<String, String> {
        parse_command_args(&self.raw_args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_marks_required_and_optional_args() {
        let def = CommandDef::new("cmd2llm add", "Add a mapping", CommandCategory::Bridge)
            .with_arg(CommandArg::required("name", "command name"))
            .with_arg(CommandArg::required("function", "function name"))
            .with_arg(CommandArg::remaining("description", "free text"));
        assert_eq!(def.usage(), "cmd2llm add <name> <function> [description]");
        assert_eq!(def.primary_alias(), "cmd2llm add");
    }

    #[test]
    fn named_args_follow_the_key_value_syntax() {
        let inv = CommandInvocation {
            key: "rmd add".into(),
            raw_alias: "rmd add".into(),
            args: vec![],
            raw_args: "time=10:00 drink water".into(),
        };
        let named = inv.named_args();
        assert_eq!(named["time"], "10:00");
        assert_eq!(named["text"], "drink water");
    }
}
