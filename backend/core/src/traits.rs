use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use cmdbridge_routing::RoutingAddress;

use crate::channel::{Completion, QueuedEvent};
use crate::envelope::CommandEnvelope;
use crate::error::BridgeError;
use crate::message::MessageChain;

/// A live, send-capable client owned by a platform adapter
/// (a bot handle, a web client, ...).
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Platform id this client belongs to (e.g. "telegram").
    fn platform(&self) -> &str;

    /// Deliver a chain to a conversation.
    async fn send(&self, target: &RoutingAddress, chain: &MessageChain) -> Result<()>;
}

/// A connected platform adapter as the host exposes it.
///
/// The bridge never creates or closes adapters; it only borrows their
/// handles long enough to attach them to a synthesized envelope.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// Platform id (e.g. "aiocqhttp").
    fn id(&self) -> &str;

    /// Look up a live client exposed under `attribute` ("bot", "client",
    /// "web_client", ...). `None` when the adapter has no such handle.
    fn handle(&self, attribute: &str) -> Option<Arc<dyn PlatformClient>>;

    /// Send directly through the adapter, addressed by session.
    async fn send_by_session(&self, target: &RoutingAddress, chain: &MessageChain) -> Result<()>;
}

/// The host's command-submission surface: accepts an envelope and hands
/// back a completion signal for its handling.
#[async_trait]
pub trait EventSubmitter: Send + Sync {
    async fn submit(&self, envelope: CommandEnvelope) -> Result<Completion, BridgeError>;
}

/// A long-running consumer of the host event queue.
#[async_trait]
pub trait EventConsumer: Send + Sync + 'static {
    /// Human-readable name of this consumer.
    fn name(&self) -> &str;

    /// Run the consumer loop until the queue closes.
    async fn start(&self, rx: mpsc::Receiver<QueuedEvent>) -> Result<()>;
}
