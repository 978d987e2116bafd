use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::envelope::CommandEnvelope;
use crate::error::BridgeError;
use crate::traits::EventSubmitter;

/// Default capacity of the host event queue.
const DEFAULT_BUFFER_SIZE: usize = 256;

/// How the host finished handling one event. `Err` carries the failure text.
pub type HandlingOutcome = Result<(), String>;

/// An event waiting in the host queue together with its completion signal.
pub struct QueuedEvent {
    pub envelope: Arc<CommandEnvelope>,
    done: Option<oneshot::Sender<HandlingOutcome>>,
}

impl QueuedEvent {
    /// Signal completion. Only the first call has any effect.
    pub fn complete(&mut self, outcome: HandlingOutcome) {
        if let Some(done) = self.done.take() {
            // The submitter may have stopped waiting (timeout); that is fine.
            let _ = done.send(outcome);
        }
    }

    /// Split into the envelope and a detached completion signal so the
    /// event can be handled on another task.
    pub fn into_parts(self) -> (Arc<CommandEnvelope>, CompletionSender) {
        (self.envelope, CompletionSender(self.done))
    }
}

/// Detached completion signal of a [`QueuedEvent`].
pub struct CompletionSender(Option<oneshot::Sender<HandlingOutcome>>);

impl CompletionSender {
    pub fn complete(mut self, outcome: HandlingOutcome) {
        if let Some(done) = self.0.take() {
            let _ = done.send(outcome);
        }
    }
}

/// Receiving side of a submission's completion signal.
pub struct Completion {
    rx: oneshot::Receiver<HandlingOutcome>,
}

impl Completion {
    /// Wait until the host reports the event handled.
    pub async fn wait(self) -> Result<(), BridgeError> {
        match self.rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(reason)) => Err(BridgeError::DispatchFailed(reason)),
            Err(_) => Err(BridgeError::DispatchFailed(
                "event dropped before completion".to_string(),
            )),
        }
    }
}

/// The host event queue: bounded, single consumer.
pub struct EventQueue {
    tx: mpsc::Sender<QueuedEvent>,
    rx: Option<mpsc::Receiver<QueuedEvent>>,
}

impl EventQueue {
    /// Create a queue with the default capacity.
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    /// Create a queue with a custom capacity.
    pub fn with_buffer_size(buffer: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer);
        info!(buffer_size = buffer, "Event queue initialized");
        Self { tx, rx: Some(rx) }
    }

    /// A cloneable submitter for this queue.
    pub fn submitter(&self) -> QueueSubmitter {
        QueueSubmitter { tx: self.tx.clone() }
    }

    /// Take the consumer side (can only be called once).
    pub fn take_rx(&mut self) -> Option<mpsc::Receiver<QueuedEvent>> {
        debug!("Event queue receiver taken");
        self.rx.take()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Submits envelopes without waiting for queue space.
#[derive(Clone)]
pub struct QueueSubmitter {
    tx: mpsc::Sender<QueuedEvent>,
}

#[async_trait]
impl EventSubmitter for QueueSubmitter {
    async fn submit(&self, envelope: CommandEnvelope) -> Result<Completion, BridgeError> {
        let (done_tx, done_rx) = oneshot::channel();
        let event = QueuedEvent {
            envelope: Arc::new(envelope),
            done: Some(done_tx),
        };
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                BridgeError::DispatchFailed("event queue is full".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => {
                BridgeError::ChannelClosed("event queue".to_string())
            }
        })?;
        Ok(Completion { rx: done_rx })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{InboundMessage, PlatformMetadata};
    use cmdbridge_routing::RoutingAddress;

    fn envelope(command: &str) -> CommandEnvelope {
        let address = RoutingAddress::parse("webchat:FriendMessage:s1");
        let message = InboundMessage::synthetic(&address, command, "command_to_llm", "u1", None);
        CommandEnvelope::generic(address, message, PlatformMetadata::new("webchat", "test"))
    }

    #[tokio::test]
    async fn submit_then_complete() {
        let mut queue = EventQueue::new();
        let mut rx = queue.take_rx().unwrap();
        let completion = queue.submitter().submit(envelope("/ping")).await.unwrap();

        let mut event = rx.recv().await.unwrap();
        assert_eq!(event.envelope.message_str, "/ping");
        event.complete(Ok(()));
        event.complete(Err("ignored".into()));

        assert!(completion.wait().await.is_ok());
    }

    #[tokio::test]
    async fn failed_outcome_surfaces_reason() {
        let mut queue = EventQueue::new();
        let mut rx = queue.take_rx().unwrap();
        let completion = queue.submitter().submit(envelope("/boom")).await.unwrap();

        let (_, done) = rx.recv().await.unwrap().into_parts();
        done.complete(Err("handler panicked".into()));

        let err = completion.wait().await.unwrap_err();
        assert!(err.to_string().contains("handler panicked"));
    }

    #[tokio::test]
    async fn dropped_event_is_a_failure() {
        let mut queue = EventQueue::new();
        let mut rx = queue.take_rx().unwrap();
        let completion = queue.submitter().submit(envelope("/gone")).await.unwrap();
        drop(rx.recv().await.unwrap());
        assert!(completion.wait().await.is_err());
    }

    #[tokio::test]
    async fn take_rx_once() {
        let mut queue = EventQueue::new();
        assert!(queue.take_rx().is_some());
        assert!(queue.take_rx().is_none());
    }

    #[tokio::test]
    async fn full_queue_rejects_without_blocking() {
        let mut queue = EventQueue::with_buffer_size(1);
        let _rx = queue.take_rx().unwrap();
        let submitter = queue.submitter();
        assert!(submitter.submit(envelope("/a")).await.is_ok());
        let err = submitter.submit(envelope("/b")).await.err().unwrap();
        assert!(matches!(err, BridgeError::DispatchFailed(_)));
    }

    #[tokio::test]
    async fn closed_queue_reports_channel_closed() {
        let mut queue = EventQueue::new();
        drop(queue.take_rx());
        let err = queue.submitter().submit(envelope("/a")).await.err().unwrap();
        assert!(matches!(err, BridgeError::ChannelClosed(_)));
    }
}
