//! Envelope synthesizer. Builds a convincing inbound event for any platform.
//!
//! Synthesis never fails: when the platform is unsupported, not connected,
//! or its adapter does not have the handle the platform's events need, the
//! generic pre-woken envelope is returned instead.

use tracing::{info, warn};

use cmdbridge_core::{BridgeError, CommandEnvelope, InboundMessage, PlatformMetadata, RoutingAddress};

use crate::platform::{find_variant, PlatformVariant};
use crate::registry::PlatformRegistry;

/// Default self id and metadata description stamped on synthesized events.
pub const DEFAULT_SELF_ID: &str = "command_to_llm";

#[derive(Clone)]
pub struct EnvelopeSynthesizer {
    platforms: PlatformRegistry,
    self_id: String,
}

impl EnvelopeSynthesizer {
    pub fn new(platforms: PlatformRegistry) -> Self {
        Self::with_self_id(platforms, DEFAULT_SELF_ID)
    }

    pub fn with_self_id(platforms: PlatformRegistry, self_id: impl Into<String>) -> Self {
        Self {
            platforms,
            self_id: self_id.into(),
        }
    }

    pub fn platforms(&self) -> &PlatformRegistry {
        &self.platforms
    }

    /// Build an envelope carrying `command` for the conversation at `origin`.
    pub async fn synthesize(
        &self,
        origin: &str,
        command: &str,
        sender_id: &str,
        sender_name: Option<&str>,
    ) -> CommandEnvelope {
        let address = RoutingAddress::parse(origin);
        let message = InboundMessage::synthetic(&address, command, &self.self_id, sender_id, sender_name);
        let meta = PlatformMetadata::new(address.platform.clone(), self.self_id.clone());

        let Some(variant) = find_variant(&address.platform) else {
            return self.generic(address, message, meta);
        };

        match self
            .platform_envelope(variant, origin, address.clone(), message.clone(), meta.clone())
            .await
        {
            Ok(envelope) => {
                info!(platform = variant.id, event = variant.event, "Platform envelope created");
                envelope
            }
            Err(e) => {
                warn!(platform = variant.id, event = variant.event, error = %e, "Falling back to generic envelope");
                self.generic(address, message, meta)
            }
        }
    }

    async fn platform_envelope(
        &self,
        variant: &PlatformVariant,
        origin: &str,
        address: RoutingAddress,
        message: InboundMessage,
        meta: PlatformMetadata,
    ) -> Result<CommandEnvelope, BridgeError> {
        let adapter = self.platforms.get_platform(variant.id).await;
        let handle = variant.resolve_handle(adapter)?;
        variant.construct(origin, address, message, meta, handle)
    }

    fn generic(
        &self,
        address: RoutingAddress,
        message: InboundMessage,
        meta: PlatformMetadata,
    ) -> CommandEnvelope {
        info!(platform = %address.platform, "Using generic envelope");
        CommandEnvelope::generic(address, message, meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loopback::LoopbackAdapter;
    use crate::platform::{HandleShape, PLATFORM_VARIANTS};
    use cmdbridge_core::{ConversationKind, EnvelopeVariant};

    async fn connected_registry() -> PlatformRegistry {
        let registry = PlatformRegistry::new();
        for variant in PLATFORM_VARIANTS {
            let attr = match variant.shape {
                HandleShape::Attribute(attr) => attr,
                HandleShape::Adapter | HandleShape::Detached => "unused",
            };
            registry.register(LoopbackAdapter::new(variant.id, attr)).await;
        }
        registry
    }

    #[tokio::test]
    async fn every_supported_platform_gets_its_own_variant() {
        let synth = EnvelopeSynthesizer::new(connected_registry().await);
        for variant in PLATFORM_VARIANTS {
            let origin = format!("{}:GroupMessage:g1_u9", variant.id);
            let env = synth.synthesize(&origin, "/weather", "u9", Some("bob")).await;

            assert!(!env.is_generic(), "{} fell back", variant.id);
            assert!(env.live_handle().is_some(), "{} has no handle", variant.id);
            assert_eq!(env.unified_msg_origin, origin);
            assert_eq!(env.session_id, "g1_u9");
            assert_eq!(env.kind(), ConversationKind::Group);
            assert_eq!(env.message.group_id.as_deref(), Some("g1"));
            assert_eq!(env.message_str, "/weather");
            assert!(!env.is_wake);
        }
    }

    #[tokio::test]
    async fn unknown_platform_goes_straight_to_generic() {
        let synth = EnvelopeSynthesizer::new(connected_registry().await);
        let env = synth.synthesize("irc:FriendMessage:nick", "/help", "u1", None).await;
        assert!(env.is_generic());
        assert!(env.is_wake);
        assert!(env.is_at_or_wake_command);
        assert_eq!(env.unified_msg_origin, "irc:FriendMessage:nick");
        assert_eq!(env.sender_name(), Some("用户"));
    }

    #[tokio::test]
    async fn disconnected_platform_falls_back() {
        let synth = EnvelopeSynthesizer::new(PlatformRegistry::new());
        let env = synth.synthesize("telegram:FriendMessage:42", "/help", "42", None).await;
        assert!(env.is_generic());
        assert_eq!(env.session_id, "42");
    }

    #[tokio::test]
    async fn adapter_missing_expected_handle_falls_back() {
        let registry = PlatformRegistry::new();
        registry.register(LoopbackAdapter::new("slack", "client")).await;
        let synth = EnvelopeSynthesizer::new(registry);
        let env = synth.synthesize("slack:FriendMessage:U1", "/help", "U1", None).await;
        assert!(env.is_generic());
    }

    #[tokio::test]
    async fn handle_from_another_platform_falls_back() {
        let registry = PlatformRegistry::new();
        // An adapter registered under a platform id whose client reports
        // a different platform.
        registry.register(MisfiledAdapter::new()).await;
        let synth = EnvelopeSynthesizer::new(registry);
        let env = synth.synthesize("discord:FriendMessage:c1", "/help", "c1", None).await;
        assert!(env.is_generic());
    }

    #[tokio::test]
    async fn webchat_builds_without_adapter() {
        let synth = EnvelopeSynthesizer::new(PlatformRegistry::new());
        let env = synth.synthesize("webchat:FriendMessage:abc:def", "/help", "u", None).await;
        assert!(matches!(env.variant(), EnvelopeVariant::Platform { handle: None, .. }));
        assert_eq!(env.session_id, "abc:def");
        assert_eq!(env.kind(), ConversationKind::Direct);
    }

    struct MisfiledAdapter {
        inner: std::sync::Arc<LoopbackAdapter>,
    }

    impl MisfiledAdapter {
        fn new() -> std::sync::Arc<Self> {
            std::sync::Arc::new(Self {
                inner: LoopbackAdapter::new("telegram", "client"),
            })
        }
    }

    #[async_trait::async_trait]
    impl cmdbridge_core::PlatformAdapter for MisfiledAdapter {
        fn id(&self) -> &str {
            "discord"
        }

        fn handle(&self, attribute: &str) -> Option<std::sync::Arc<dyn cmdbridge_core::PlatformClient>> {
            self.inner.handle(attribute)
        }

        async fn send_by_session(
            &self,
            target: &RoutingAddress,
            chain: &cmdbridge_core::MessageChain,
        ) -> anyhow::Result<()> {
            self.inner.send_by_session(target, chain).await
        }
    }
}
