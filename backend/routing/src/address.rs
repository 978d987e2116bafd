/// Routing address: the `platform:kind:session` key identifying a conversation.
///
/// The host addresses every conversation with a colon-delimited string such as
/// `aiocqhttp:GroupMessage:123_456`. The session segment may itself contain
/// colons, so everything after the second delimiter is re-joined rather than
/// split on the last colon.
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Literal token the host embeds for group conversations.
pub const GROUP_TOKEN: &str = "GroupMessage";
/// Literal token the host embeds for one-to-one conversations.
pub const DIRECT_TOKEN: &str = "FriendMessage";

const UNKNOWN: &str = "unknown";

/// Direct or group conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    #[default]
    Direct,
    Group,
}

impl ConversationKind {
    /// Loose parse of the middle segment: any occurrence of the group token
    /// wins, everything else is treated as a direct conversation.
    pub fn from_token(token: &str) -> Self {
        if token.contains(GROUP_TOKEN) {
            ConversationKind::Group
        } else {
            ConversationKind::Direct
        }
    }

    pub fn as_token(&self) -> &'static str {
        match self {
            ConversationKind::Direct => DIRECT_TOKEN,
            ConversationKind::Group => GROUP_TOKEN,
        }
    }
}

/// A parsed routing address. Immutable once parsed.
///
/// `Display` writes the kind segment exactly as it was parsed, so a parsed
/// address prints back as its origin string. The one lossy case is an
/// address with fewer than three segments, which prints as
/// `unknown:FriendMessage:unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoutingAddress {
    pub platform: String,
    pub kind: ConversationKind,
    /// Middle segment as given (e.g. `SuperGroupMessageV2`).
    pub kind_token: String,
    pub session_id: String,
}

impl RoutingAddress {
    pub fn new(
        platform: impl Into<String>,
        kind: ConversationKind,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            platform: platform.into(),
            kind,
            kind_token: kind.as_token().to_string(),
            session_id: session_id.into(),
        }
    }

    /// Parse a raw address. Never fails: an address with fewer than three
    /// segments yields an `unknown` platform and session, direct kind.
    pub fn parse(raw: &str) -> Self {
        let parts: Vec<&str> = raw.split(':').collect();
        if parts.len() < 3 {
            debug!(address = %raw, "Routing address has fewer than 3 segments");
            return Self::new(UNKNOWN, ConversationKind::Direct, UNKNOWN);
        }
        Self {
            platform: parts[0].to_string(),
            kind: ConversationKind::from_token(parts[1]),
            kind_token: parts[1].to_string(),
            session_id: parts[2..].join(":"),
        }
    }

    pub fn is_group(&self) -> bool {
        self.kind == ConversationKind::Group
    }

    /// Group id for group conversations. Isolated sessions are encoded as
    /// `<group>_<user>`, so only the part before the first `_` is kept.
    pub fn group_id(&self) -> Option<&str> {
        if !self.is_group() {
            return None;
        }
        Some(
            self.session_id
                .split_once('_')
                .map(|(group, _)| group)
                .unwrap_or(&self.session_id),
        )
    }
}

impl std::fmt::Display for RoutingAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.platform, self.kind_token, self.session_id)
    }
}
