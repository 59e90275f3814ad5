//! [`Bus`] implementation backed by a rumqttc client.
//!
//! `connect` drives the event loop until the broker acknowledges the
//! session, then hands it to a pump task that forwards inbound publishes
//! into an `mpsc` channel and keeps the connection alive. rumqttc reconnects
//! on the next poll after an error; the pump re-subscribes every filter once
//! the broker acknowledges the new session.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rumqttc::{
    AsyncClient, ConnAck, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions,
    Outgoing, Packet, QoS,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use toad_app::ports::{Bus, BusMessage};
use toad_domain::error::ToadError;

use crate::config::MqttConfig;
use crate::error::MqttError;

/// Capacity of the rumqttc request channel.
const REQUEST_CAPACITY: usize = 64;
/// Capacity of the inbound message channel.
const INBOUND_CAPACITY: usize = 256;
/// Pause between reconnection attempts.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// MQTT connection used as the controller's message bus.
pub struct MqttBus {
    client: AsyncClient,
    filters: Arc<Mutex<Vec<String>>>,
    pump: JoinHandle<()>,
}

impl MqttBus {
    /// Connect to the broker and start forwarding inbound publishes.
    ///
    /// Returns the bus and the receiver of inbound messages. The receiver
    /// closes once the bus is disconnected.
    ///
    /// # Errors
    ///
    /// [`MqttError::Connection`] when the broker is unreachable,
    /// [`MqttError::Refused`] when it rejects the session and
    /// [`MqttError::ConnectTimeout`] when it does not answer in time.
    pub async fn connect(
        config: &MqttConfig,
    ) -> Result<(Self, mpsc::Receiver<BusMessage>), MqttError> {
        let mut options = MqttOptions::new(
            config.client_id.clone(),
            config.broker_host.clone(),
            config.broker_port,
        );
        options.set_keep_alive(config.keep_alive());
        let (client, mut eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);

        let timeout = config.connect_timeout();
        tokio::time::timeout(timeout, wait_for_connack(&mut eventloop))
            .await
            .map_err(|_| MqttError::ConnectTimeout(timeout))??;
        tracing::info!(
            host = %config.broker_host,
            port = config.broker_port,
            client_id = %config.client_id,
            "connected to MQTT broker"
        );

        let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);
        let filters = Arc::new(Mutex::new(Vec::new()));
        let pump = Pump {
            client: client.clone(),
            filters: Arc::clone(&filters),
            inbound: tx,
        };
        let pump = tokio::spawn(pump.run(eventloop));

        Ok((
            Self {
                client,
                filters,
                pump,
            },
            rx,
        ))
    }

    fn remember(&self, filter: &str) {
        if let Ok(mut filters) = self.filters.lock()
            && !filters.iter().any(|known| known == filter)
        {
            filters.push(filter.to_string());
        }
    }
}

impl Drop for MqttBus {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

impl Bus for MqttBus {
    fn subscribe(&self, filter: &str) -> impl Future<Output = Result<(), ToadError>> + Send {
        self.remember(filter);
        let filter = filter.to_string();
        async move {
            tracing::debug!(%filter, "subscribing");
            self.client
                .subscribe(filter, QoS::AtLeastOnce)
                .await
                .map_err(|err| MqttError::Client(err).into_domain())
        }
    }

    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), ToadError>> + Send {
        let topic = topic.to_string();
        async move {
            self.client
                .publish(topic, QoS::AtLeastOnce, false, payload)
                .await
                .map_err(|err| MqttError::Client(err).into_domain())
        }
    }

    fn disconnect(&self) -> impl Future<Output = Result<(), ToadError>> + Send {
        async move {
            tracing::info!("disconnecting from MQTT broker");
            self.client
                .disconnect()
                .await
                .map_err(|err| MqttError::Client(err).into_domain())
        }
    }
}

async fn wait_for_connack(eventloop: &mut EventLoop) -> Result<(), MqttError> {
    loop {
        let event = eventloop.poll().await.map_err(|err| match err {
            ConnectionError::ConnectionRefused(code) => MqttError::Refused(code),
            other => MqttError::Connection(other),
        })?;
        match event {
            Event::Incoming(Packet::ConnAck(ConnAck { code, .. })) => {
                return match code {
                    ConnectReturnCode::Success => Ok(()),
                    refused => Err(MqttError::Refused(refused)),
                };
            }
            event => tracing::trace!(?event, "waiting for CONNACK"),
        }
    }
}

/// Owns the event loop once connected.
struct Pump {
    client: AsyncClient,
    filters: Arc<Mutex<Vec<String>>>,
    inbound: mpsc::Sender<BusMessage>,
}

impl Pump {
    async fn run(self, mut eventloop: EventLoop) {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let message = BusMessage::new(publish.topic, publish.payload.to_vec());
                    if self.inbound.send(message).await.is_err() {
                        tracing::debug!("inbound receiver dropped, stopping MQTT pump");
                        break;
                    }
                }
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    tracing::info!("reconnected to MQTT broker");
                    self.resubscribe();
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    tracing::debug!("MQTT session closed");
                    break;
                }
                Ok(event) => tracing::trace!(?event, "MQTT event"),
                Err(err) => {
                    tracing::warn!(%err, "MQTT connection error, reconnecting");
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }

    fn resubscribe(&self) {
        let filters = match self.filters.lock() {
            Ok(filters) => filters.clone(),
            Err(_) => return,
        };
        for filter in filters {
            // The pump is the only poller, so never wait on the request queue.
            if let Err(err) = self.client.try_subscribe(filter.as_str(), QoS::AtLeastOnce) {
                tracing::warn!(%filter, %err, "failed to re-subscribe");
            }
        }
    }
}
