//! Control loop: subscribes to the bus, handles inbound messages and keeps
//! the registry fresh until told to stop.
//!
//! ```text
//! Connecting ──subscribe──▶ Subscribed ──▶ Running ──stop──▶ Stopping ──drain──▶ Stopped
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use toad_domain::error::ToadError;
use toad_domain::time;

use crate::pipeline::CommandPipeline;
use crate::ports::{Bus, BusMessage, DeviceTransport, RegistrySource};
use crate::registry_cache::{RegistryCache, RegistryRefresher};

/// Topic suffix the startup time is announced on.
const ANNOUNCE_SUFFIX: &str = "TIME";

/// Lifecycle of the [`ControlLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    Connecting,
    Subscribed,
    Running,
    Stopping,
    Stopped,
}

impl fmt::Display for ControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connecting => "connecting",
            Self::Subscribed => "subscribed",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        })
    }
}

/// Timing knobs of the control loop.
#[derive(Debug, Clone, Copy)]
pub struct ControlLoopConfig {
    /// Interval between registry refreshes.
    pub poll_interval: Duration,
    /// Snapshot age after which refresh failures are logged as errors.
    pub stale_after: Duration,
}

impl Default for ControlLoopConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            stale_after: Duration::from_secs(300),
        }
    }
}

/// Coordinates bus-message handling and registry refresh.
pub struct ControlLoop<B, S, T> {
    bus: B,
    source: S,
    pipeline: CommandPipeline<T>,
    config: ControlLoopConfig,
    state: watch::Sender<ControlState>,
}

impl<B, S, T> ControlLoop<B, S, T>
where
    B: Bus,
    S: RegistrySource + 'static,
    T: DeviceTransport + 'static,
{
    pub fn new(bus: B, source: S, pipeline: CommandPipeline<T>, config: ControlLoopConfig) -> Self {
        let (state, _) = watch::channel(ControlState::Connecting);
        Self {
            bus,
            source,
            pipeline,
            config,
            state,
        }
    }

    /// Observe state transitions.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<ControlState> {
        self.state.subscribe()
    }

    /// The registry cache the pipeline reads from.
    #[must_use]
    pub fn registry(&self) -> Arc<RegistryCache> {
        Arc::clone(self.pipeline.cache())
    }

    /// Run until `stop` is cancelled or the inbound channel closes.
    ///
    /// Each inbound message is handled in its own task. On stop the bus is
    /// disconnected and in-flight messages are allowed to finish.
    ///
    /// # Errors
    ///
    /// Returns the bus error when the initial subscription fails. Nothing
    /// that happens once running ends the loop except the stop signal.
    pub async fn run(
        self,
        mut inbound: mpsc::Receiver<BusMessage>,
        stop: CancellationToken,
    ) -> Result<(), ToadError> {
        let Self {
            bus,
            source,
            pipeline,
            config,
            state,
        } = self;
        let transition = |next: ControlState| {
            tracing::info!(state = %next, "control loop state changed");
            state.send_replace(next);
        };

        transition(ControlState::Connecting);
        let filter = pipeline.resolver().subscription();
        if let Err(err) = bus.subscribe(&filter).await {
            tracing::error!(%err, %filter, "bus subscription failed");
            transition(ControlState::Stopped);
            return Err(err);
        }
        transition(ControlState::Subscribed);

        let announce_topic = format!("{}/{ANNOUNCE_SUFFIX}", pipeline.resolver().base_topic());
        announce(&bus, &announce_topic).await;
        transition(ControlState::Running);

        let refresh_stop = stop.child_token();
        let refresher = RegistryRefresher::new(
            Arc::clone(pipeline.cache()),
            source,
            config.poll_interval,
            config.stale_after,
        )
        .spawn(refresh_stop.clone());

        let mut in_flight = JoinSet::new();
        loop {
            tokio::select! {
                () = stop.cancelled() => break,
                message = inbound.recv() => {
                    let Some(message) = message else {
                        tracing::warn!("bus inbound channel closed");
                        break;
                    };
                    if message.topic == announce_topic {
                        tracing::trace!(topic = %message.topic, "ignoring startup announcement echo");
                        continue;
                    }
                    tracing::debug!(topic = %message.topic, "bus message received");
                    let pipeline = pipeline.clone();
                    in_flight.spawn(async move { pipeline.process(message).await });
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(err) = joined {
                        tracing::error!(%err, "message task ended abnormally");
                    }
                }
            }
        }

        transition(ControlState::Stopping);
        refresh_stop.cancel();
        if let Err(err) = bus.disconnect().await {
            tracing::warn!(%err, "bus disconnect failed");
        }
        let pending = in_flight.len();
        if pending > 0 {
            tracing::info!(pending, "waiting for in-flight commands");
        }
        while let Some(joined) = in_flight.join_next().await {
            if let Err(err) = joined {
                tracing::error!(%err, "message task ended abnormally");
            }
        }
        if let Err(err) = refresher.await {
            tracing::error!(%err, "registry refresher ended abnormally");
        }
        transition(ControlState::Stopped);
        Ok(())
    }
}

/// Publish the startup time on `topic`.
async fn announce<B: Bus>(bus: &B, topic: &str) {
    let payload = time::now().timestamp().to_string().into_bytes();
    if let Err(err) = bus.publish(topic, payload).await {
        tracing::warn!(%err, %topic, "startup announcement failed");
    }
}
