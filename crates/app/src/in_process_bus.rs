//! In-process bus backed by tokio channels.
//!
//! Stands in for a broker: publishes that match a subscription are delivered
//! to the inbound `mpsc` receiver, and every publish is also broadcast to
//! observers. Used to run the control loop without a broker.

use std::future::Future;
use std::sync::Mutex;

use tokio::sync::{broadcast, mpsc};

use toad_domain::error::ToadError;

use crate::ports::bus::{Bus, BusMessage, topic_matches};

/// Error raised when the in-process bus has been disconnected.
#[derive(Debug, thiserror::Error)]
#[error("in-process bus is disconnected")]
pub struct Disconnected;

/// In-process bus using an [`mpsc`] channel for inbound delivery and a
/// [`broadcast`] channel for observing outbound publishes.
pub struct InProcessBus {
    inbound: Mutex<Option<mpsc::Sender<BusMessage>>>,
    filters: Mutex<Vec<String>>,
    published: broadcast::Sender<BusMessage>,
}

impl InProcessBus {
    /// Create a bus with the given channel capacity, returning the receiver
    /// the control loop consumes.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<BusMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        let (published, _) = broadcast::channel(capacity);
        let bus = Self {
            inbound: Mutex::new(Some(tx)),
            filters: Mutex::new(Vec::new()),
            published,
        };
        (bus, rx)
    }

    /// Observe every message published on this bus *after* the call.
    #[must_use]
    pub fn watch(&self) -> broadcast::Receiver<BusMessage> {
        self.published.subscribe()
    }

    fn sender(&self) -> Option<mpsc::Sender<BusMessage>> {
        self.inbound.lock().ok().and_then(|guard| guard.clone())
    }

    fn is_subscribed(&self, topic: &str) -> bool {
        self.filters
            .lock()
            .map(|filters| filters.iter().any(|filter| topic_matches(filter, topic)))
            .unwrap_or(false)
    }

    async fn deliver(&self, message: BusMessage) -> Result<(), ToadError> {
        // Fails only when nobody is watching.
        let _ = self.published.send(message.clone());

        if !self.is_subscribed(&message.topic) {
            return Ok(());
        }
        let sender = self
            .sender()
            .ok_or_else(|| ToadError::Bus(Box::new(Disconnected)))?;
        sender
            .send(message)
            .await
            .map_err(|_| ToadError::Bus(Box::new(Disconnected)))
    }
}

impl Bus for InProcessBus {
    fn subscribe(&self, filter: &str) -> impl Future<Output = Result<(), ToadError>> + Send {
        let result = match self.filters.lock() {
            Ok(mut filters) if self.sender().is_some() => {
                filters.push(filter.to_string());
                Ok(())
            }
            _ => Err(ToadError::Bus(Box::new(Disconnected))),
        };
        async { result }
    }

    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), ToadError>> + Send {
        self.deliver(BusMessage::new(topic, payload))
    }

    fn disconnect(&self) -> impl Future<Output = Result<(), ToadError>> + Send {
        // Dropping the sender closes the inbound channel once drained.
        if let Ok(mut guard) = self.inbound.lock() {
            guard.take();
        }
        async { Ok(()) }
    }
}
