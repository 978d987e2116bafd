//! Command envelope: the inbound event handed to the host's command path.
//!
//! An envelope owns its outbound sink. In live mode a handler's `send` goes
//! through whatever platform handle the envelope carries; once a capture
//! buffer is installed every `send` is appended to that buffer instead and
//! nothing reaches the network.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use cmdbridge_routing::{ConversationKind, RoutingAddress};

use crate::error::BridgeError;
use crate::event::{InboundMessage, PlatformMetadata};
use crate::message::MessageChain;
use crate::traits::{PlatformAdapter, PlatformClient};

// ---------------------------------------------------------------------------
// Live handle
// ---------------------------------------------------------------------------

/// A borrowed, send-capable platform handle.
#[derive(Clone)]
pub enum LiveHandle {
    /// A client object exposed by the adapter (bot, client, web_client).
    Client(Arc<dyn PlatformClient>),
    /// The adapter itself, for platforms whose events send through it.
    Adapter(Arc<dyn PlatformAdapter>),
}

impl LiveHandle {
    pub fn platform(&self) -> &str {
        match self {
            LiveHandle::Client(client) => client.platform(),
            LiveHandle::Adapter(adapter) => adapter.id(),
        }
    }

    async fn deliver(&self, target: &RoutingAddress, chain: &MessageChain) -> anyhow::Result<()> {
        match self {
            LiveHandle::Client(client) => client.send(target, chain).await,
            LiveHandle::Adapter(adapter) => adapter.send_by_session(target, chain).await,
        }
    }
}

impl std::fmt::Debug for LiveHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LiveHandle::Client(client) => write!(f, "Client({})", client.platform()),
            LiveHandle::Adapter(adapter) => write!(f, "Adapter({})", adapter.id()),
        }
    }
}

/// Which construction produced the envelope.
#[derive(Debug, Clone)]
pub enum EnvelopeVariant {
    /// Platform-specific envelope; `handle` is `None` only for platforms
    /// that can be constructed without a connected adapter.
    Platform {
        platform: String,
        handle: Option<LiveHandle>,
    },
    /// Platform-agnostic fallback with no live handle.
    Generic,
}

// ---------------------------------------------------------------------------
// Capture buffer
// ---------------------------------------------------------------------------

/// Ordered buffer of chains a handler attempted to send.
///
/// One buffer per dispatch; clones share the same storage so the engine can
/// keep a handle while the envelope travels through the host.
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer {
    units: Arc<Mutex<Vec<MessageChain>>>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, chain: MessageChain) -> usize {
        let mut units = self.units.lock().await;
        units.push(chain);
        units.len()
    }

    pub async fn len(&self) -> usize {
        self.units.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.units.lock().await.is_empty()
    }

    /// Take everything captured so far, in send order.
    pub async fn take(&self) -> Vec<MessageChain> {
        std::mem::take(&mut *self.units.lock().await)
    }
}

#[derive(Debug, Clone)]
enum OutboundSink {
    Live,
    Capture(CaptureBuffer),
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// A synthesized (or real) inbound message event.
#[derive(Debug)]
pub struct CommandEnvelope {
    pub message_str: String,
    pub message: InboundMessage,
    pub platform_meta: PlatformMetadata,
    pub session_id: String,
    pub address: RoutingAddress,
    pub unified_msg_origin: String,
    /// Bypasses the host's wake-word / mention gating.
    pub is_wake: bool,
    /// Already recognised as a command.
    pub is_at_or_wake_command: bool,
    variant: EnvelopeVariant,
    sink: OutboundSink,
    has_send_oper: AtomicBool,
}

impl CommandEnvelope {
    /// Platform-specific envelope. `origin` is kept verbatim as the
    /// unified origin.
    pub fn platform(
        origin: &str,
        address: RoutingAddress,
        message: InboundMessage,
        platform_meta: PlatformMetadata,
        handle: Option<LiveHandle>,
    ) -> Self {
        Self {
            message_str: message.message_str.clone(),
            session_id: address.session_id.clone(),
            unified_msg_origin: origin.to_string(),
            variant: EnvelopeVariant::Platform {
                platform: platform_meta.name.clone(),
                handle,
            },
            message,
            platform_meta,
            address,
            is_wake: false,
            is_at_or_wake_command: false,
            sink: OutboundSink::Live,
            has_send_oper: AtomicBool::new(false),
        }
    }

    /// Generic fallback: no live handle, pre-woken and pre-flagged as a
    /// command. The origin is rebuilt from the metadata name, the
    /// conversation kind token and the session id.
    pub fn generic(address: RoutingAddress, message: InboundMessage, platform_meta: PlatformMetadata) -> Self {
        let unified_msg_origin = format!(
            "{}:{}:{}",
            platform_meta.name,
            message.kind.as_token(),
            address.session_id
        );
        Self {
            message_str: message.message_str.clone(),
            session_id: address.session_id.clone(),
            unified_msg_origin,
            variant: EnvelopeVariant::Generic,
            message,
            platform_meta,
            address,
            is_wake: true,
            is_at_or_wake_command: true,
            sink: OutboundSink::Live,
            has_send_oper: AtomicBool::new(false),
        }
    }

    pub fn variant(&self) -> &EnvelopeVariant {
        &self.variant
    }

    pub fn is_generic(&self) -> bool {
        matches!(self.variant, EnvelopeVariant::Generic)
    }

    pub fn live_handle(&self) -> Option<&LiveHandle> {
        match &self.variant {
            EnvelopeVariant::Platform { handle, .. } => handle.as_ref(),
            EnvelopeVariant::Generic => None,
        }
    }

    pub fn kind(&self) -> ConversationKind {
        self.message.kind
    }

    pub fn sender_id(&self) -> &str {
        &self.message.sender.user_id
    }

    /// Sender nickname as reported by the transport, if any.
    pub fn sender_name(&self) -> Option<&str> {
        self.message.sender.nickname.as_deref()
    }

    /// Redirect every subsequent `send` into a fresh buffer and return a
    /// handle to it.
    pub fn capture_replies(&mut self) -> CaptureBuffer {
        let buffer = CaptureBuffer::new();
        self.sink = OutboundSink::Capture(buffer.clone());
        info!(origin = %self.unified_msg_origin, "Capture sink installed");
        buffer
    }

    /// Whether any handler called `send` on this envelope.
    pub fn has_sent(&self) -> bool {
        self.has_send_oper.load(Ordering::SeqCst)
    }

    /// Convenience for handlers: a single plain-text reply chain.
    pub fn plain_result(&self, text: impl Into<String>) -> MessageChain {
        MessageChain::plain(text)
    }

    /// Send a reply for this event.
    pub async fn send(&self, chain: MessageChain) -> Result<(), BridgeError> {
        self.has_send_oper.store(true, Ordering::SeqCst);
        match &self.sink {
            OutboundSink::Capture(buffer) => {
                let components = chain.len();
                let total = buffer.push(chain).await;
                info!(components, captured = total, "Captured command reply");
                Ok(())
            }
            OutboundSink::Live => match self.live_handle() {
                Some(handle) => {
                    debug!(platform = handle.platform(), origin = %self.unified_msg_origin, "Sending reply");
                    handle.deliver(&self.address, &chain).await.map_err(BridgeError::Other)
                }
                None => {
                    warn!(
                        origin = %self.unified_msg_origin,
                        "Envelope has no live platform handle; reply dropped"
                    );
                    Ok(())
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct RecordingClient {
        sent: Mutex<Vec<(String, MessageChain)>>,
    }

    #[async_trait]
    impl PlatformClient for RecordingClient {
        fn platform(&self) -> &str {
            "telegram"
        }

        async fn send(&self, target: &RoutingAddress, chain: &MessageChain) -> anyhow::Result<()> {
            self.sent.lock().await.push((target.to_string(), chain.clone()));
            Ok(())
        }
    }

    fn parts(origin: &str) -> (RoutingAddress, InboundMessage, PlatformMetadata) {
        let address = RoutingAddress::parse(origin);
        let message = InboundMessage::synthetic(&address, "/ping", "command_to_llm", "u1", None);
        let meta = PlatformMetadata::new(address.platform.clone(), "command_to_llm");
        (address, message, meta)
    }

    #[test]
    fn generic_envelope_is_pre_woken() {
        let (address, message, meta) = parts("mystery:GroupMessage:g1_u1");
        let env = CommandEnvelope::generic(address, message, meta);
        assert!(env.is_generic());
        assert!(env.is_wake);
        assert!(env.is_at_or_wake_command);
        assert!(env.live_handle().is_none());
        assert_eq!(env.unified_msg_origin, "mystery:GroupMessage:g1_u1");
    }

    #[tokio::test]
    async fn capture_sink_buffers_instead_of_sending() {
        let client = Arc::new(RecordingClient { sent: Mutex::new(Vec::new()) });
        let (address, message, meta) = parts("telegram:FriendMessage:99");
        let mut env = CommandEnvelope::platform(
            "telegram:FriendMessage:99",
            address,
            message,
            meta,
            Some(LiveHandle::Client(client.clone())),
        );

        let buffer = env.capture_replies();
        env.send(MessageChain::plain("one")).await.unwrap();
        env.send(MessageChain::plain("two")).await.unwrap();

        assert!(env.has_sent());
        assert!(client.sent.lock().await.is_empty());
        let units = buffer.take().await;
        assert_eq!(units, vec![MessageChain::plain("one"), MessageChain::plain("two")]);
    }

    #[tokio::test]
    async fn live_sink_delivers_through_handle() {
        let client = Arc::new(RecordingClient { sent: Mutex::new(Vec::new()) });
        let (address, message, meta) = parts("telegram:FriendMessage:99");
        let env = CommandEnvelope::platform(
            "telegram:FriendMessage:99",
            address,
            message,
            meta,
            Some(LiveHandle::Client(client.clone())),
        );

        env.send(MessageChain::plain("hello")).await.unwrap();
        let sent = client.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "telegram:FriendMessage:99");
    }

    #[tokio::test]
    async fn live_sink_without_handle_drops_reply() {
        let (address, message, meta) = parts("unknown:FriendMessage:1");
        let env = CommandEnvelope::generic(address, message, meta);
        assert!(env.send(MessageChain::plain("lost")).await.is_ok());
        assert!(env.has_sent());
    }
}
