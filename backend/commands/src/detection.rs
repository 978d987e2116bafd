/// Command detection: identify commands in inbound message text.
use crate::registry::CommandRegistry;
use crate::types::{CommandArg, CommandInvocation};

/// Strip the longest matching wake prefix from `text`.
///
/// Returns `None` when the text does not start with any of the prefixes.
pub fn strip_wake_prefix<'a>(text: &'a str, wake_prefixes: &[String]) -> Option<&'a str> {
    wake_prefixes
        .iter()
        .filter(|p| !p.is_empty() && text.starts_with(p.as_str()))
        .max_by_key(|p| p.len())
        .map(|p| &text[p.len()..])
}

/// Detect a command in a message.
///
/// A message is considered addressed to the bot when it starts with a wake
/// prefix, or when the event was already woken by the transport
/// (`pre_woken`), in which case the text is matched as-is. Returns `None`
/// for normal messages and for woken text that matches no command.
pub fn detect_command(
    text: &str,
    wake_prefixes: &[String],
    pre_woken: bool,
    registry: &CommandRegistry,
) -> Option<CommandInvocation> {
    let trimmed = text.trim();
    let body = match strip_wake_prefix(trimmed, wake_prefixes) {
        Some(body) => body.trim_start(),
        None if pre_woken => trimmed,
        None => return None,
    };

    let (def, alias_len) = registry.match_prefix(body)?;
    let rest = body[alias_len..].trim();

    Some(CommandInvocation {
        key: def.key.clone(),
        raw_alias: body[..alias_len].to_string(),
        args: parse_args(rest, &def.args),
        raw_args: rest.to_string(),
    })
}

fn parse_args(text: &str, arg_defs: &[CommandArg]) -> Vec<String> {
    if text.is_empty() || arg_defs.is_empty() {
        return vec![];
    }

    let mut result = Vec::new();
    let mut remaining = text.trim();

    for (i, def) in arg_defs.iter().enumerate() {
        if remaining.is_empty() {
            break;
        }
        if def.capture_remaining || i == arg_defs.len() - 1 {
            result.push(remaining.to_string());
            break;
        }
        // Take one token
        let (token, rest) = remaining
            .split_once(char::is_whitespace)
            .map(|(t, r)| (t.to_string(), r.trim()))
            .unwrap_or((remaining.to_string(), ""));
        result.push(token);
        remaining = rest;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CommandCategory, CommandDef};

    fn prefixes() -> Vec<String> {
        vec!["/".to_string()]
    }

    fn registry() -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        registry.register(
            CommandDef::new("cmd2llm add", "Add", CommandCategory::Bridge)
                .with_arg(CommandArg::required("name", ""))
                .with_arg(CommandArg::required("function", ""))
                .with_arg(CommandArg::remaining("description", "")),
        );
        registry.register(CommandDef::new("weather", "Weather", CommandCategory::Host));
        registry
    }

    #[test]
    fn plain_chat_is_not_a_command() {
        assert!(detect_command("weather is nice", &prefixes(), false, &registry()).is_none());
    }

    #[test]
    fn wake_prefix_is_required_unless_pre_woken() {
        let registry = registry();
        assert_eq!(detect_command("/weather", &prefixes(), false, &registry).unwrap().key, "weather");
        assert_eq!(detect_command("weather", &prefixes(), true, &registry).unwrap().key, "weather");
        assert_eq!(detect_command("/weather", &prefixes(), true, &registry).unwrap().key, "weather");
    }

    #[test]
    fn multi_word_command_with_args() {
        let inv = detect_command(
            "/cmd2llm add rmd--ls list_reminders 列出 所有提醒",
            &prefixes(),
            false,
            &registry(),
        )
        .unwrap();
        assert_eq!(inv.key, "cmd2llm add");
        assert_eq!(inv.args, vec!["rmd--ls", "list_reminders", "列出 所有提醒"]);
        assert_eq!(inv.raw_args, "rmd--ls list_reminders 列出 所有提醒");
    }

    #[test]
    fn unknown_woken_command_is_none() {
        assert!(detect_command("/nope", &prefixes(), false, &registry()).is_none());
    }

    #[test]
    fn longest_wake_prefix_is_stripped() {
        let prefixes = vec!["/".to_string(), "//".to_string()];
        assert_eq!(strip_wake_prefix("//help", &prefixes), Some("help"));
        assert_eq!(strip_wake_prefix("help", &prefixes), None);
    }
}
