use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::trace;

/// Trait implemented by payload types that can be carried on the bus.
pub trait Event: Clone + Send + Sync + std::fmt::Debug + 'static {}

impl<T> Event for T where T: Clone + Send + Sync + std::fmt::Debug + 'static {}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("no subscribers for event")]
    NoSubscribers,
}

#[async_trait]
pub trait EventBus<E>: Send + Sync
where
    E: Event,
{
    async fn publish(&self, event: E) -> Result<(), BusError>;
    fn subscribe(&self) -> broadcast::Receiver<E>;
}

/// In-memory broadcast bus.
pub struct InMemoryBus<E>
where
    E: Event,
{
    sender: broadcast::Sender<E>,
}

impl<E> InMemoryBus<E>
where
    E: Event,
{
    pub fn new(capacity: usize) -> Arc<Self> {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Arc::new(Self { sender })
    }

    /// Publishes from synchronous code. Events with no listener are dropped.
    pub fn emit(&self, event: E) {
        if self.sender.send(event).is_err() {
            trace!("event dropped, no subscribers");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl<E> EventBus<E> for InMemoryBus<E>
where
    E: Event,
{
    async fn publish(&self, event: E) -> Result<(), BusError> {
        self.sender
            .send(event)
            .map(|_| ())
            .map_err(|_| BusError::NoSubscribers)
    }

    fn subscribe(&self) -> broadcast::Receiver<E> {
        self.sender.subscribe()
    }
}

/// Helper to materialise an mpsc receiver from the bus subscription
/// so callers can await events without handling broadcast semantics directly.
pub fn to_mpsc<E>(bus: Arc<InMemoryBus<E>>, capacity: usize) -> mpsc::Receiver<E>
where
    E: Event,
{
    let mut rx = bus.subscribe();
    let (tx, out_rx) = mpsc::channel(capacity.max(1));
    tokio::spawn(async move {
        while let Ok(ev) = rx.recv().await {
            if tx.send(ev).await.is_err() {
                break;
            }
        }
    });
    out_rx
}
