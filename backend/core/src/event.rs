use chrono::Utc;
use serde::{Deserialize, Serialize};

use cmdbridge_routing::{ConversationKind, RoutingAddress};

use crate::message::Component;

/// Display name used when a synthetic sender has none.
pub const DEFAULT_SENDER_NAME: &str = "用户";

/// Sender identity of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMember {
    pub user_id: String,
    pub nickname: Option<String>,
}

impl MessageMember {
    pub fn new(user_id: impl Into<String>, nickname: Option<impl Into<String>>) -> Self {
        Self {
            user_id: user_id.into(),
            nickname: nickname.map(Into::into),
        }
    }
}

/// Which platform adapter an event claims to come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformMetadata {
    pub name: String,
    pub description: String,
}

impl PlatformMetadata {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Platform-neutral inbound message, as the host's command path reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub message_str: String,
    pub session_id: String,
    pub kind: ConversationKind,
    pub self_id: String,
    pub message_id: String,
    pub sender: MessageMember,
    pub group_id: Option<String>,
    pub message: Vec<Component>,
    /// Transport-shaped mirror for handlers that inspect the raw payload.
    pub raw_message: serde_json::Value,
}

impl InboundMessage {
    /// Build a synthetic inbound message carrying `command` as its only
    /// content. The sender name falls back to [`DEFAULT_SENDER_NAME`].
    pub fn synthetic(
        address: &RoutingAddress,
        command: &str,
        self_id: &str,
        sender_id: &str,
        sender_name: Option<&str>,
    ) -> Self {
        let nickname = sender_name.unwrap_or(DEFAULT_SENDER_NAME);
        let mut raw_message = serde_json::json!({
            "message": command,
            "message_type": address.kind.as_token(),
            "sender": { "user_id": sender_id, "nickname": nickname },
            "self_id": self_id,
        });
        let group_id = address.group_id().map(str::to_string);
        if let Some(group_id) = &group_id {
            raw_message["group_id"] = serde_json::Value::String(group_id.clone());
        }

        Self {
            message_str: command.to_string(),
            session_id: address.session_id.clone(),
            kind: address.kind,
            self_id: self_id.to_string(),
            message_id: format!("{}_{}", self_id, Utc::now().timestamp_millis()),
            sender: MessageMember::new(sender_id, Some(nickname)),
            group_id,
            message: vec![Component::plain(command)],
            raw_message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_group_message_carries_group_id_and_mirror() {
        let addr = RoutingAddress::parse("aiocqhttp:GroupMessage:123_456");
        let msg = InboundMessage::synthetic(&addr, "/weather city=Paris", "command_to_llm", "42", Some("alice"));

        assert_eq!(msg.session_id, "123_456");
        assert_eq!(msg.group_id.as_deref(), Some("123"));
        assert_eq!(msg.message, vec![Component::plain("/weather city=Paris")]);
        assert_eq!(msg.raw_message["message_type"], "GroupMessage");
        assert_eq!(msg.raw_message["sender"]["nickname"], "alice");
        assert_eq!(msg.raw_message["group_id"], "123");
        assert!(msg.message_id.starts_with("command_to_llm_"));
    }

    #[test]
    fn synthetic_sender_name_defaults_to_placeholder() {
        let addr = RoutingAddress::parse("telegram:FriendMessage:77");
        let msg = InboundMessage::synthetic(&addr, "/help", "command_to_llm", "77", None);
        assert_eq!(msg.sender.nickname.as_deref(), Some(DEFAULT_SENDER_NAME));
        assert_eq!(msg.group_id, None);
        assert!(msg.raw_message.get("group_id").is_none());
    }
}
