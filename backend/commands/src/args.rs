/// Argument micro-syntax shared by the bridge's callers.
///
/// `key=value` tokens become named arguments; every other token is appended
/// to the `text` argument, space separated.
use std::collections::BTreeMap;

/// Name of the argument collecting bare tokens.
pub const TEXT_ARG: &str = "text";

/// `"a=1 hello b=2 world"` ⇒ `{a: "1", b: "2", text: "hello world"}`.
///
/// Values are split at the first `=`, so `time=08:00=x` keeps `08:00=x`.
pub fn parse_command_args(args: &str) -> BTreeMap<String, String> {
    let mut parsed = BTreeMap::new();
    for part in args.split_whitespace() {
        match part.split_once('=') {
            Some((key, value)) => {
                parsed.insert(key.trim().to_string(), value.trim().to_string());
            }
            None => {
                parsed
                    .entry(TEXT_ARG.to_string())
                    .and_modify(|text: &mut String| {
                        text.push(' ');
                        text.push_str(part);
                    })
                    .or_insert_with(|| part.to_string());
            }
        }
    }
    parsed
}

/// `name k=v ...`, or just `name` when there are no arguments.
pub fn build_command_string(name: &str, args: &BTreeMap<String, String>) -> String {
    if args.is_empty() {
        return name.to_string();
    }
    let pairs: Vec<String> = args.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{} {}", name, pairs.join(" "))
}

/// Validation errors for a new mapping; empty when it is acceptable.
///
/// Command names may contain spaces (multi-level commands such as `rmd ls`).
pub fn validate_mapping(command_name: &str, function_name: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if command_name.trim().is_empty() {
        errors.push("命令名称不能为空".to_string());
    }
    if function_name.trim().is_empty() {
        errors.push("LLM函数名称不能为空".to_string());
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_and_bare_tokens() {
        let args = parse_command_args("a=1 hello b=2 world");
        assert_eq!(args.get("a").map(String::as_str), Some("1"));
        assert_eq!(args.get("b").map(String::as_str), Some("2"));
        assert_eq!(args.get("text").map(String::as_str), Some("hello world"));
    }

    #[test]
    fn value_keeps_later_equals_signs() {
        let args = parse_command_args("time=08:00=x");
        assert_eq!(args["time"], "08:00=x");
        assert!(parse_command_args("").is_empty());
    }

    #[test]
    fn build_with_and_without_args() {
        assert_eq!(build_command_string("rmd ls", &BTreeMap::new()), "rmd ls");
        let args = parse_command_args("text=喝水 time=10:00");
        assert_eq!(build_command_string("rmd add", &args), "rmd add text=喝水 time=10:00");
    }

    #[test]
    fn validation_collects_every_problem() {
        assert!(validate_mapping("rmd ls", "list_reminders").is_empty());
        assert_eq!(
            validate_mapping(" ", ""),
            vec!["命令名称不能为空".to_string(), "LLM函数名称不能为空".to_string()]
        );
    }
}
