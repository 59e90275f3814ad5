//! MQTT adapter error types.

use std::time::Duration;

use toad_domain::error::ToadError;

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The connection to the broker could not be established.
    #[error("MQTT connection failed")]
    Connection(#[source] rumqttc::ConnectionError),

    /// The broker answered the connection request with a refusal.
    #[error("MQTT broker refused the connection: {0:?}")]
    Refused(rumqttc::ConnectReturnCode),

    /// The broker did not accept the connection in time.
    #[error("MQTT broker did not answer within {0:?}")]
    ConnectTimeout(Duration),

    /// The rumqttc client returned an error.
    #[error("MQTT client error")]
    Client(#[source] rumqttc::ClientError),
}

impl MqttError {
    /// Convert into a [`ToadError::Bus`] for propagation across port
    /// boundaries.
    pub fn into_domain(self) -> ToadError {
        ToadError::Bus(Box::new(self))
    }
}

impl From<MqttError> for ToadError {
    fn from(err: MqttError) -> Self {
        err.into_domain()
    }
}
