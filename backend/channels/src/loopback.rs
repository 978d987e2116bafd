//! Loopback platform adapter.
//!
//! An in-process adapter that records everything sent through it instead of
//! talking to a network. Used by the CLI demo host and by tests.

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::info;

use cmdbridge_core::{MessageChain, PlatformAdapter, PlatformClient, RoutingAddress};

/// One recorded outbound message.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub target: String,
    pub chain: MessageChain,
    pub at: Instant,
}

/// Client half of the loopback adapter; shares the adapter's log.
pub struct LoopbackClient {
    platform: String,
    log: Arc<Mutex<Vec<SentMessage>>>,
    fail_sends: bool,
}

#[async_trait]
impl PlatformClient for LoopbackClient {
    fn platform(&self) -> &str {
        &self.platform
    }

    async fn send(&self, target: &RoutingAddress, chain: &MessageChain) -> Result<()> {
        record(&self.log, self.fail_sends, target, chain).await
    }
}

pub struct LoopbackAdapter {
    id: String,
    attribute: String,
    client: Arc<LoopbackClient>,
    log: Arc<Mutex<Vec<SentMessage>>>,
    fail_sends: bool,
}

impl LoopbackAdapter {
    /// Adapter `id` exposing its client under `attribute`.
    pub fn new(id: impl Into<String>, attribute: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::build(id.into(), attribute.into(), false))
    }

    /// Same as [`LoopbackAdapter::new`] but every send fails.
    pub fn failing(id: impl Into<String>, attribute: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::build(id.into(), attribute.into(), true))
    }

    fn build(id: String, attribute: String, fail_sends: bool) -> Self {
        let log = Arc::new(Mutex::new(Vec::new()));
        let client = Arc::new(LoopbackClient {
            platform: id.clone(),
            log: log.clone(),
            fail_sends,
        });
        Self {
            id,
            attribute,
            client,
            log,
            fail_sends,
        }
    }

    /// Everything sent so far through the adapter or its client.
    pub async fn sent(&self) -> Vec<SentMessage> {
        self.log.lock().await.clone()
    }
}

#[async_trait]
impl PlatformAdapter for LoopbackAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn handle(&self, attribute: &str) -> Option<Arc<dyn PlatformClient>> {
        if attribute == self.attribute {
            Some(self.client.clone())
        } else {
            None
        }
    }

    async fn send_by_session(&self, target: &RoutingAddress, chain: &MessageChain) -> Result<()> {
        record(&self.log, self.fail_sends, target, chain).await
    }
}

async fn record(
    log: &Mutex<Vec<SentMessage>>,
    fail: bool,
    target: &RoutingAddress,
    chain: &MessageChain,
) -> Result<()> {
    if fail {
        bail!("loopback send to {} refused", target);
    }
    info!(target = %target, components = chain.len(), "Loopback send");
    log.lock().await.push(SentMessage {
        target: target.to_string(),
        chain: chain.clone(),
        at: Instant::now(),
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn client_and_adapter_share_one_log() {
        let adapter = LoopbackAdapter::new("lark", "bot");
        let client = adapter.handle("bot").unwrap();
        assert!(adapter.handle("client").is_none());

        let target = RoutingAddress::parse("lark:FriendMessage:ou_1");
        client.send(&target, &MessageChain::plain("a")).await.unwrap();
        adapter.send_by_session(&target, &MessageChain::plain("b")).await.unwrap();

        let sent = adapter.sent().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].chain, MessageChain::plain("b"));
    }

    #[tokio::test]
    async fn failing_adapter_refuses_sends() {
        let adapter = LoopbackAdapter::failing("slack", "web_client");
        let target = RoutingAddress::parse("slack:FriendMessage:U1");
        assert!(adapter.send_by_session(&target, &MessageChain::plain("x")).await.is_err());
        assert!(adapter.sent().await.is_empty());
    }
}
