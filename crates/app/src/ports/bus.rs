//! Bus port: the publish/subscribe boundary.
//!
//! Inbound messages are not delivered through callbacks: the adapter that
//! owns the connection pushes them into an `mpsc` channel whose receiver is
//! handed to the [`ControlLoop`](crate::control_loop::ControlLoop).
//! Subscriptions, outbound publishes and disconnection go through [`Bus`].

use std::future::Future;

use toad_domain::error::ToadError;

/// A message received from the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl BusMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Outbound side of a bus connection.
pub trait Bus: Send + Sync {
    /// Subscribe to every topic matching `filter` (MQTT wildcard syntax).
    fn subscribe(&self, filter: &str) -> impl Future<Output = Result<(), ToadError>> + Send;

    /// Publish `payload` on `topic` with at-least-once delivery.
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), ToadError>> + Send;

    /// Close the connection gracefully.
    fn disconnect(&self) -> impl Future<Output = Result<(), ToadError>> + Send;
}

impl<T: Bus> Bus for std::sync::Arc<T> {
    fn subscribe(&self, filter: &str) -> impl Future<Output = Result<(), ToadError>> + Send {
        (**self).subscribe(filter)
    }

    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), ToadError>> + Send {
        (**self).publish(topic, payload)
    }

    fn disconnect(&self) -> impl Future<Output = Result<(), ToadError>> + Send {
        (**self).disconnect()
    }
}

/// Whether `topic` matches the MQTT topic `filter` (`+` and `#` wildcards).
#[must_use]
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');
    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (None, None) => return true,
            (Some("+"), Some(_)) => {}
            (Some(expected), Some(actual)) if expected == actual => {}
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_match_multi_level_wildcard() {
        assert!(topic_matches("base/#", "base/row/0"));
        assert!(topic_matches("base/#", "base"));
        assert!(!topic_matches("base/#", "other/row/0"));
    }

    #[test]
    fn should_match_single_level_wildcard() {
        assert!(topic_matches("base/+/0", "base/row/0"));
        assert!(!topic_matches("base/+", "base/row/0"));
    }

    #[test]
    fn should_match_exact_topic() {
        assert!(topic_matches("base/TIME", "base/TIME"));
        assert!(!topic_matches("base/TIME", "base/TIMES"));
    }
}
