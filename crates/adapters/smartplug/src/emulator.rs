//! Smart-plug emulator: the device side of the command protocol.
//!
//! Each connection carries one encrypted command. A command the emulated
//! device accepts switches its relay and is answered with an encrypted
//! `{"system":{"set_relay_state":{"err_code":0}}}`; anything else (bad key,
//! bad JSON, unsupported state) gets the connection closed without a reply.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use toad_domain::address::DeviceAddress;
use toad_domain::relay::{DeviceCommand, RelayState};

use crate::codec::Codec;

/// Largest request the emulated device reads.
const REQUEST_LIMIT: u64 = 2048;

/// A listening emulated smart plug.
pub struct SmartPlugEmulator {
    listener: TcpListener,
    device: Arc<EmulatedDevice>,
}

/// Shared view on an emulated device's relay, usable after it is spawned.
#[derive(Clone)]
pub struct EmulatorHandle {
    device: Arc<EmulatedDevice>,
}

struct EmulatedDevice {
    codec: Codec,
    accepts: Mutex<Option<RelayState>>,
    relay: Mutex<Option<RelayState>>,
    switched: AtomicUsize,
}

impl SmartPlugEmulator {
    /// Listen on `addr`; use port `0` to let the OS pick one.
    ///
    /// # Errors
    ///
    /// Returns the error of binding the listener.
    pub async fn bind(addr: impl ToSocketAddrs, codec: Codec) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            device: Arc::new(EmulatedDevice {
                codec,
                accepts: Mutex::new(None),
                relay: Mutex::new(None),
                switched: AtomicUsize::new(0),
            }),
        })
    }

    /// Only accept commands switching the relay to `state`, like firmware
    /// that refuses the other state.
    #[must_use]
    pub fn only_accepting(self, state: RelayState) -> Self {
        if let Ok(mut accepts) = self.device.accepts.lock() {
            *accepts = Some(state);
        }
        self
    }

    /// The socket address the emulator listens on.
    ///
    /// # Errors
    ///
    /// Returns the error of querying the listener.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The listening address as a registry-ready [`DeviceAddress`].
    ///
    /// # Errors
    ///
    /// Returns the error of querying the listener.
    pub fn device_address(&self) -> io::Result<DeviceAddress> {
        let addr = self.local_addr()?;
        Ok(DeviceAddress::new(addr.ip().to_string(), addr.port()))
    }

    #[must_use]
    pub fn handle(&self) -> EmulatorHandle {
        EmulatorHandle {
            device: Arc::clone(&self.device),
        }
    }

    /// Serve connections until `stop` is cancelled.
    pub fn spawn(self, stop: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.serve(stop))
    }

    async fn serve(self, stop: CancellationToken) {
        loop {
            tokio::select! {
                () = stop.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let device = Arc::clone(&self.device);
                        tokio::spawn(async move {
                            if let Err(err) = device.serve_one(stream).await {
                                tracing::debug!(%peer, %err, "emulated device connection failed");
                            }
                        });
                    }
                    Err(err) => tracing::warn!(%err, "emulated device failed to accept"),
                },
            }
        }
    }
}

impl EmulatorHandle {
    /// The relay state last set by an accepted command.
    #[must_use]
    pub fn relay_state(&self) -> Option<RelayState> {
        self.device.relay.lock().ok().and_then(|relay| *relay)
    }

    /// How many commands were accepted.
    #[must_use]
    pub fn commands_accepted(&self) -> usize {
        self.device.switched.load(Ordering::SeqCst)
    }
}

impl EmulatedDevice {
    async fn serve_one(&self, mut stream: TcpStream) -> io::Result<()> {
        let mut request = Vec::new();
        (&mut stream)
            .take(REQUEST_LIMIT)
            .read_to_end(&mut request)
            .await?;

        match self.accept(&request) {
            Some(state) => {
                let reply = json!({"system": {"set_relay_state": {"err_code": 0}}});
                match self.codec.encrypt_json(&reply) {
                    Ok(sealed) => {
                        self.switch(state);
                        stream.write_all(&sealed).await?;
                    }
                    Err(err) => tracing::warn!(%err, "emulated device failed to encode reply"),
                }
            }
            None => tracing::debug!(bytes = request.len(), "emulated device refused command"),
        }
        stream.shutdown().await
    }

    fn accept(&self, request: &[u8]) -> Option<RelayState> {
        let command: DeviceCommand = self.codec.decrypt_json(request).ok()?;
        let state = command.relay_state()?;
        let accepts = self.accepts.lock().ok().and_then(|accepts| *accepts);
        match accepts {
            Some(accepted) if accepted != state => None,
            _ => Some(state),
        }
    }

    fn switch(&self, state: RelayState) {
        if let Ok(mut relay) = self.relay.lock() {
            *relay = Some(state);
        }
        self.switched.fetch_add(1, Ordering::SeqCst);
    }
}
