/// Host command registry.
///
/// Starts with the built-in status commands; the bridge and the embedding
/// host register their own commands on top.
use crate::types::{CommandCategory, CommandDef};

/// The built-in commands every host pipeline knows.
pub fn builtin_commands() -> Vec<CommandDef> {
    vec![
        CommandDef::new("help", "Show available commands.", CommandCategory::Status)
            .with_alias("commands"),
        CommandDef::new("whoami", "Show your sender id.", CommandCategory::Status).with_alias("id"),
    ]
}

#[derive(Debug, Clone)]
pub struct CommandRegistry {
    commands: Vec<CommandDef>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self { commands: builtin_commands() }
    }

    /// Register an additional command, replacing one with the same key.
    pub fn register(&mut self, def: CommandDef) {
        self.commands.retain(|c| c.key != def.key);
        self.commands.push(def);
    }

    pub fn all(&self) -> &[CommandDef] {
        &self.commands
    }

    /// Longest alias that prefixes `text` on a word boundary.
    ///
    /// Returns the command and the byte length of the matched alias, so
    /// `"rmd ls all"` resolves to `rmd ls` rather than `rmd` when both exist.
    pub fn match_prefix(&self, text: &str) -> Option<(&CommandDef, usize)> {
        let mut best: Option<(&CommandDef, usize)> = None;
        for def in &self.commands {
            for alias in &def.text_aliases {
                let len = alias.len();
                let Some(head) = text.get(..len) else { continue };
                if !head.eq_ignore_ascii_case(alias) {
                    continue;
                }
                let on_boundary = text[len..].chars().next().is_none_or(char::is_whitespace);
                if on_boundary && best.is_none_or(|(_, l)| len > l) {
                    best = Some((def, len));
                }
            }
        }
        best
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
