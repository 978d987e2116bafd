/// Platform registry: the host's table of connected adapters.
///
/// Lookups hand out shared references; the registry never owns the
/// adapters' lifecycles beyond holding them while they are connected.
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use cmdbridge_core::{BridgeError, MessageChain, PlatformAdapter, RoutingAddress};

#[derive(Default, Clone)]
pub struct PlatformRegistry {
    platforms: Arc<RwLock<HashMap<String, Arc<dyn PlatformAdapter>>>>,
}

impl PlatformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connected adapter under its id, replacing any previous one.
    pub async fn register(&self, adapter: Arc<dyn PlatformAdapter>) {
        let id = adapter.id().to_string();
        info!(platform = %id, "Platform adapter registered");
        self.platforms.write().await.insert(id, adapter);
    }

    /// Forget an adapter (e.g. after it disconnected).
    pub async fn unregister(&self, id: &str) -> bool {
        self.platforms.write().await.remove(id).is_some()
    }

    pub async fn get_platform(&self, id: &str) -> Option<Arc<dyn PlatformAdapter>> {
        let found = self.platforms.read().await.get(id).cloned();
        if found.is_none() {
            debug!(platform = %id, "Platform not connected");
        }
        found
    }

    /// Connected platform ids, sorted.
    pub async fn platform_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.platforms.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Actively send a chain to a conversation by its routing address.
    ///
    /// Returns `Ok(false)` when the platform is not connected.
    pub async fn send_message(&self, origin: &str, chain: &MessageChain) -> Result<bool, BridgeError> {
        let address = RoutingAddress::parse(origin);
        let Some(adapter) = self.get_platform(&address.platform).await else {
            warn!(origin = %origin, "Cannot send: platform not connected");
            return Ok(false);
        };
        adapter.send_by_session(&address, chain).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loopback::LoopbackAdapter;

    #[tokio::test]
    async fn register_lookup_unregister() {
        let registry = PlatformRegistry::new();
        registry.register(LoopbackAdapter::new("telegram", "client")).await;
        assert!(registry.get_platform("telegram").await.is_some());
        assert!(registry.get_platform("discord").await.is_none());
        assert_eq!(registry.platform_ids().await, vec!["telegram".to_string()]);
        assert!(registry.unregister("telegram").await);
        assert!(registry.get_platform("telegram").await.is_none());
    }

    #[tokio::test]
    async fn send_message_routes_by_platform() {
        let registry = PlatformRegistry::new();
        let adapter = LoopbackAdapter::new("aiocqhttp", "bot");
        registry.register(adapter.clone()).await;

        let chain = MessageChain::plain("hi");
        assert!(registry.send_message("aiocqhttp:GroupMessage:1_2", &chain).await.unwrap());
        assert!(!registry.send_message("slack:FriendMessage:U1", &chain).await.unwrap());

        let sent = adapter.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].target, "aiocqhttp:GroupMessage:1_2");
    }

    #[tokio::test]
    async fn send_target_matches_the_origin_string() {
        let registry = PlatformRegistry::new();
        let adapter = LoopbackAdapter::new("lark", "bot");
        registry.register(adapter.clone()).await;

        let origin = "lark:SuperGroupMessageV2:oc_1";
        assert!(registry.send_message(origin, &MessageChain::plain("hi")).await.unwrap());
        assert_eq!(adapter.sent().await[0].target, origin);
    }
}
