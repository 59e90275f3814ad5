//! Command dispatcher: fans one command out to every resolved target.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;

use toad_domain::address::DeviceAddress;
use toad_domain::outcome::{CommandResult, DispatchReport, FailureReason};
use toad_domain::relay::DeviceCommand;
use toad_domain::resolver::ResolvedTargets;

use crate::ports::DeviceTransport;

/// Sends a relay command to many devices concurrently.
pub struct Dispatcher<T> {
    transport: Arc<T>,
}

impl<T> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T> Dispatcher<T> {
    /// The transport commands are sent through.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: DeviceTransport + 'static> Dispatcher<T> {
    /// Create a dispatcher sending through `transport`.
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    /// Command every address in `targets`, one task per address.
    ///
    /// Tasks are started in resolution order and collected as they finish,
    /// so the report is in completion order. A task that dies without a
    /// result is reported as a connection failure for its address.
    pub async fn dispatch(&self, targets: &ResolvedTargets) -> DispatchReport {
        let command = DeviceCommand::set_relay_state(targets.state);
        let mut tasks = JoinSet::new();
        let mut pending: HashMap<tokio::task::Id, DeviceAddress> = HashMap::new();

        for address in &targets.addresses {
            let transport = Arc::clone(&self.transport);
            let command = command.clone();
            let target = address.clone();
            let handle = tasks.spawn(async move { transport.send(&target, &command).await });
            pending.insert(handle.id(), address.clone());
        }

        let mut report = DispatchReport::default();
        while let Some(joined) = tasks.join_next_with_id().await {
            let result = match joined {
                Ok((id, result)) => {
                    pending.remove(&id);
                    result
                }
                Err(err) => {
                    let Some(address) = pending.remove(&err.id()) else {
                        continue;
                    };
                    tracing::error!(%address, %err, "command task ended without a result");
                    CommandResult::failed(address, FailureReason::ConnectionFailed)
                }
            };
            match result.reason {
                Some(reason) => {
                    tracing::debug!(address = %result.address, %reason, "device command failed");
                }
                None => tracing::debug!(address = %result.address, "device command succeeded"),
            }
            report.record(result);
        }
        report
    }
}
