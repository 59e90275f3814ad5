//! Command pipeline: resolve one bus message, then dispatch it.

use std::sync::Arc;

use toad_domain::address::DeviceAddress;
use toad_domain::error::ValidationError;
use toad_domain::outcome::DispatchReport;
use toad_domain::resolver::TopicResolver;

use crate::dispatcher::Dispatcher;
use crate::ports::{BusMessage, DeviceTransport};
use crate::registry_cache::RegistryCache;

/// Everything needed to turn a bus message into device commands.
///
/// Cheap to clone; each inbound message gets its own copy.
pub struct CommandPipeline<T> {
    resolver: Arc<TopicResolver>,
    cache: Arc<RegistryCache>,
    dispatcher: Dispatcher<T>,
}

impl<T> Clone for CommandPipeline<T> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
            cache: Arc::clone(&self.cache),
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<T: DeviceTransport + 'static> CommandPipeline<T> {
    pub fn new(resolver: TopicResolver, cache: Arc<RegistryCache>, transport: T) -> Self {
        Self {
            resolver: Arc::new(resolver),
            cache,
            dispatcher: Dispatcher::new(transport),
        }
    }

    #[must_use]
    pub fn resolver(&self) -> &TopicResolver {
        &self.resolver
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<RegistryCache> {
        &self.cache
    }

    /// Resolve `message` against the current snapshot and command every target.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationError`] that rejected the message; no device
    /// is contacted in that case.
    #[tracing::instrument(skip_all, fields(topic = %message.topic))]
    pub async fn handle(&self, message: &BusMessage) -> Result<DispatchReport, ValidationError> {
        let snapshot = self.cache.snapshot();
        let targets = self
            .resolver
            .resolve(&message.topic, &message.payload, &snapshot)?;
        tracing::debug!(
            targets = %join(&targets.addresses),
            state = %targets.state,
            "resolved targets"
        );
        Ok(self.dispatcher.dispatch(&targets).await)
    }

    /// Handle `message` and log the aggregate outcome; never fails.
    pub async fn process(&self, message: BusMessage) {
        match self.handle(&message).await {
            Ok(report) => {
                let failed: Vec<_> = report
                    .failed
                    .iter()
                    .map(|result| match result.reason {
                        Some(reason) => format!("{} ({reason})", result.address),
                        None => result.address.to_string(),
                    })
                    .collect();
                tracing::info!(
                    topic = %message.topic,
                    ok = %join(&report.succeeded),
                    err = %failed.join(", "),
                    "command dispatched"
                );
            }
            Err(reason) => {
                tracing::warn!(topic = %message.topic, %reason, "rejected bus message");
            }
        }
    }
}

fn join(addresses: &[DeviceAddress]) -> String {
    addresses
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
