pub mod channel;
pub mod envelope;
pub mod error;
pub mod event;
pub mod message;
pub mod tools;
pub mod traits;

pub use channel::{Completion, CompletionSender, EventQueue, HandlingOutcome, QueueSubmitter, QueuedEvent};
pub use envelope::{CaptureBuffer, CommandEnvelope, EnvelopeVariant, LiveHandle};
pub use error::BridgeError;
pub use event::{InboundMessage, MessageMember, PlatformMetadata, DEFAULT_SENDER_NAME};
pub use message::{Component, MessageChain};
pub use tools::{LlmTool, ToolRegistry};
pub use traits::{EventConsumer, EventSubmitter, PlatformAdapter, PlatformClient};

pub use cmdbridge_routing::{ConversationKind, RoutingAddress};
