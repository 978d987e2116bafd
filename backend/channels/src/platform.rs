//! Platform variant table.
//!
//! Every supported platform differs only in which live handle its events
//! need and under what attribute the adapter exposes it. The table is
//! closed and iterated uniformly; the generic envelope is the fallback arm
//! and lives in the synthesizer.

use std::sync::Arc;

use cmdbridge_core::{
    BridgeError, CommandEnvelope, InboundMessage, LiveHandle, PlatformAdapter, PlatformMetadata,
    RoutingAddress,
};

/// What a platform's events need from the live adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleShape {
    /// A client object exposed by the adapter under this attribute name.
    Attribute(&'static str),
    /// The adapter object itself.
    Adapter,
    /// Nothing; the event can be built without a connected adapter.
    Detached,
}

/// One row of the platform table.
#[derive(Debug, Clone, Copy)]
pub struct PlatformVariant {
    pub id: &'static str,
    /// Host event type this variant stands in for, for logging.
    pub event: &'static str,
    pub shape: HandleShape,
}

pub const PLATFORM_VARIANTS: &[PlatformVariant] = &[
    PlatformVariant { id: "aiocqhttp", event: "AiocqhttpMessageEvent", shape: HandleShape::Attribute("bot") },
    PlatformVariant { id: "qq_official", event: "QQOfficialMessageEvent", shape: HandleShape::Attribute("client") },
    PlatformVariant { id: "telegram", event: "TelegramPlatformEvent", shape: HandleShape::Attribute("client") },
    PlatformVariant { id: "discord", event: "DiscordPlatformEvent", shape: HandleShape::Attribute("client") },
    PlatformVariant { id: "slack", event: "SlackMessageEvent", shape: HandleShape::Attribute("web_client") },
    PlatformVariant { id: "lark", event: "LarkMessageEvent", shape: HandleShape::Attribute("bot") },
    PlatformVariant { id: "wechatpadpro", event: "WeChatPadProMessageEvent", shape: HandleShape::Adapter },
    PlatformVariant { id: "webchat", event: "WebChatMessageEvent", shape: HandleShape::Detached },
    PlatformVariant { id: "dingtalk", event: "DingtalkMessageEvent", shape: HandleShape::Attribute("client") },
];

/// Find the variant for a platform id. `None` for unsupported platforms.
pub fn find_variant(platform: &str) -> Option<&'static PlatformVariant> {
    PLATFORM_VARIANTS.iter().find(|v| v.id == platform)
}

impl PlatformVariant {
    /// Pick the handle this variant needs out of the adapter, if connected.
    pub fn resolve_handle(
        &self,
        adapter: Option<Arc<dyn PlatformAdapter>>,
    ) -> Result<Option<LiveHandle>, BridgeError> {
        match (self.shape, adapter) {
            (HandleShape::Detached, adapter) => Ok(adapter.map(LiveHandle::Adapter)),
            (_, None) => Err(BridgeError::adapter_unavailable(self.id, "platform not connected")),
            (HandleShape::Adapter, Some(adapter)) => Ok(Some(LiveHandle::Adapter(adapter))),
            (HandleShape::Attribute(attr), Some(adapter)) => adapter
                .handle(attr)
                .map(|client| Some(LiveHandle::Client(client)))
                .ok_or_else(|| {
                    BridgeError::adapter_unavailable(
                        self.id,
                        format!("adapter exposes no '{}' handle", attr),
                    )
                }),
        }
    }

    /// Build the platform envelope around an already-resolved handle.
    pub fn construct(
        &self,
        origin: &str,
        address: RoutingAddress,
        message: InboundMessage,
        meta: PlatformMetadata,
        handle: Option<LiveHandle>,
    ) -> Result<CommandEnvelope, BridgeError> {
        if let Some(handle) = &handle {
            if handle.platform() != self.id {
                return Err(BridgeError::adapter_unavailable(
                    self.id,
                    format!("handle belongs to platform '{}'", handle.platform()),
                ));
            }
        }
        Ok(CommandEnvelope::platform(origin, address, message, meta, handle))
    }
}
