use serde::{Deserialize, Serialize};

/// One content component of an outbound or inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Component {
    /// Plain text.
    Plain { text: String },
    /// Mention of a user.
    At {
        user_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// Image by URL or local path.
    Image { file: String },
    /// Voice record by URL or local path.
    Record { file: String },
    /// File attachment.
    File { name: String, file: String },
    /// Quote of an earlier message.
    Reply { message_id: String },
    /// Platform emoji / sticker id.
    Face { id: String },
}

impl Component {
    pub fn plain(text: impl Into<String>) -> Self {
        Component::Plain { text: text.into() }
    }

    /// Text carried by this component, if it is text-bearing.
    pub fn text(&self) -> Option<&str> {
        match self {
            Component::Plain { text } => Some(text),
            _ => None,
        }
    }
}

/// An ordered sequence of components: one discrete message.
///
/// Each chain a handler tries to send becomes one captured output unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageChain {
    pub chain: Vec<Component>,
}

impl MessageChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single plain-text chain.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            chain: vec![Component::plain(text)],
        }
    }

    pub fn push(mut self, component: Component) -> Self {
        self.chain.push(component);
        self
    }

    pub fn extend(mut self, components: impl IntoIterator<Item = Component>) -> Self {
        self.chain.extend(components);
        self
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Concatenated text of all text-bearing components; non-text components
    /// are skipped. `None` when the chain carries no text at all.
    pub fn plain_text(&self) -> Option<String> {
        let parts: Vec<&str> = self.chain.iter().filter_map(Component::text).collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.concat())
        }
    }
}

impl From<Vec<Component>> for MessageChain {
    fn from(chain: Vec<Component>) -> Self {
        Self { chain }
    }
}
