//! TCP client implementing the [`DeviceTransport`] port.
//!
//! One connection per command: connect, write the sealed command, half-close
//! the write side, then take the reply from a single read of at most the size
//! limit. A device may keep the connection open after replying. The whole
//! exchange is bounded by the configured timeout.

use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use toad_app::ports::DeviceTransport;
use toad_domain::address::DeviceAddress;
use toad_domain::outcome::CommandResult;
use toad_domain::relay::DeviceCommand;

use crate::codec::Codec;
use crate::config::SmartPlugConfig;
use crate::error::SmartPlugError;

/// Sends relay commands to smart plugs over TCP.
#[derive(Debug, Clone)]
pub struct SmartPlugClient {
    codec: Codec,
    timeout: Duration,
    max_response_bytes: usize,
}

impl SmartPlugClient {
    #[must_use]
    pub fn new(config: &SmartPlugConfig) -> Self {
        Self {
            codec: Codec::new(&config.shared_key),
            timeout: config.timeout(),
            max_response_bytes: config.max_response_bytes,
        }
    }

    /// Send `command` to `address` and return the decrypted reply.
    ///
    /// # Errors
    ///
    /// [`SmartPlugError::NoResponse`] when the device closes without
    /// replying, [`SmartPlugError::Response`] when the reply is unreadable,
    /// and the errors of [`SmartPlugClient::send_raw`].
    pub async fn exchange(
        &self,
        address: &DeviceAddress,
        command: &DeviceCommand,
    ) -> Result<serde_json::Value, SmartPlugError> {
        let request = self
            .codec
            .encrypt_json(command)
            .map_err(SmartPlugError::Encode)?;
        let reply = self.send_raw(address, &request).await?;
        if reply.is_empty() {
            return Err(SmartPlugError::NoResponse);
        }
        self.codec
            .decrypt_json(&reply)
            .map_err(SmartPlugError::Response)
    }

    /// Write `request` verbatim and return the raw reply bytes.
    ///
    /// # Errors
    ///
    /// [`SmartPlugError::Connect`] when the device is unreachable,
    /// [`SmartPlugError::Io`] when the exchange breaks off, and
    /// [`SmartPlugError::Timeout`] when it takes longer than the timeout.
    pub async fn send_raw(
        &self,
        address: &DeviceAddress,
        request: &[u8],
    ) -> Result<Vec<u8>, SmartPlugError> {
        tokio::time::timeout(self.timeout, self.round_trip(address, request))
            .await
            .map_err(|_| SmartPlugError::Timeout(self.timeout))?
    }

    async fn round_trip(
        &self,
        address: &DeviceAddress,
        request: &[u8],
    ) -> Result<Vec<u8>, SmartPlugError> {
        let mut stream = TcpStream::connect((address.host.as_str(), address.port))
            .await
            .map_err(SmartPlugError::Connect)?;
        stream.write_all(request).await.map_err(SmartPlugError::Io)?;
        stream.shutdown().await.map_err(SmartPlugError::Io)?;

        let mut reply = vec![0_u8; self.max_response_bytes];
        match stream.read(&mut reply).await {
            Ok(read) => {
                reply.truncate(read);
                Ok(reply)
            }
            // A device that hangs up without reading everything resets the
            // connection instead of closing it.
            Err(err) if err.kind() == io::ErrorKind::ConnectionReset => Ok(Vec::new()),
            Err(err) => Err(SmartPlugError::Io(err)),
        }
    }
}

impl DeviceTransport for SmartPlugClient {
    fn send(
        &self,
        address: &DeviceAddress,
        command: &DeviceCommand,
    ) -> impl Future<Output = CommandResult> + Send {
        let address = address.clone();
        let command = command.clone();
        async move {
            match self.exchange(&address, &command).await {
                Ok(reply) => {
                    tracing::trace!(%address, %reply, "device replied");
                    CommandResult::succeeded(address)
                }
                Err(err) => {
                    tracing::debug!(%address, %err, "device exchange failed");
                    CommandResult::failed(address, err.into_domain())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_util::sync::CancellationToken;
    use toad_domain::outcome::FailureReason;
    use toad_domain::relay::RelayState;

    use crate::emulator::SmartPlugEmulator;

    const KEY: &str = "secret";

    fn client(timeout_secs: u64) -> SmartPlugClient {
        SmartPlugClient::new(&SmartPlugConfig {
            timeout_secs,
            shared_key: KEY.to_string(),
            ..SmartPlugConfig::default()
        })
    }

    fn local(listener: &TcpListener) -> DeviceAddress {
        let addr = listener.local_addr().unwrap();
        DeviceAddress::new(addr.ip().to_string(), addr.port())
    }

    #[tokio::test]
    async fn should_succeed_against_emulated_device() {
        let emulator = SmartPlugEmulator::bind("127.0.0.1:0", Codec::new(KEY))
            .await
            .unwrap();
        let address = emulator.device_address().unwrap();
        let device = emulator.handle();
        let stop = CancellationToken::new();
        emulator.spawn(stop.clone());

        let result = client(5)
            .send(&address, &DeviceCommand::set_relay_state(RelayState::On))
            .await;

        assert_eq!(result, CommandResult::succeeded(address));
        assert_eq!(device.relay_state(), Some(RelayState::On));
        stop.cancel();
    }

    #[tokio::test]
    async fn should_report_rejection_when_device_closes_silently() {
        let emulator = SmartPlugEmulator::bind("127.0.0.1:0", Codec::new(KEY))
            .await
            .unwrap()
            .only_accepting(RelayState::On);
        let address = emulator.device_address().unwrap();
        let stop = CancellationToken::new();
        emulator.spawn(stop.clone());

        let result = client(5)
            .send(&address, &DeviceCommand::set_relay_state(RelayState::Off))
            .await;

        assert_eq!(
            result,
            CommandResult::failed(address, FailureReason::Rejected)
        );
        stop.cancel();
    }

    #[tokio::test]
    async fn should_report_connection_failure_when_nobody_listens() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = local(&listener);
        drop(listener);

        let result = client(5)
            .send(&address, &DeviceCommand::set_relay_state(RelayState::On))
            .await;

        assert_eq!(
            result,
            CommandResult::failed(address, FailureReason::ConnectionFailed)
        );
    }

    #[tokio::test]
    async fn should_report_timeout_when_device_never_answers() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = local(&listener);
        let silent = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(stream);
        });

        let result = client(1)
            .send(&address, &DeviceCommand::set_relay_state(RelayState::On))
            .await;

        assert_eq!(result, CommandResult::failed(address, FailureReason::Timeout));
        silent.abort();
    }

    #[tokio::test]
    async fn should_report_malformed_response_for_unreadable_reply() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = local(&listener);
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            stream.read_to_end(&mut request).await.unwrap();
            stream.write_all(b"definitely not sealed").await.unwrap();
        });

        let result = client(5)
            .send(&address, &DeviceCommand::set_relay_state(RelayState::On))
            .await;

        assert_eq!(
            result,
            CommandResult::failed(address, FailureReason::MalformedResponse)
        );
    }

    #[tokio::test]
    async fn should_cap_reply_size() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = local(&listener);
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            stream.read_to_end(&mut request).await.unwrap();
            let _ = stream.write_all(&[7_u8; 10_000]).await;
        });

        let reply = client(5).send_raw(&address, b"ping").await.unwrap();

        assert!(!reply.is_empty());
        assert!(reply.len() <= 2048);
    }

    #[tokio::test]
    async fn should_succeed_when_device_keeps_connection_open_after_reply() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = local(&listener);
        let device = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            stream.read_to_end(&mut request).await.unwrap();
            let ack = serde_json::json!({"system": {"set_relay_state": {"err_code": 0}}});
            let sealed = Codec::new(KEY).encrypt_json(&ack).unwrap();
            stream.write_all(&sealed).await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(stream);
        });

        let result = client(1)
            .send(&address, &DeviceCommand::set_relay_state(RelayState::On))
            .await;

        assert_eq!(result, CommandResult::succeeded(address));
        device.abort();
    }
}
