//! Smart-plug adapter error types.

use std::time::Duration;

use toad_domain::outcome::FailureReason;

/// Errors raised while encrypting or decrypting protocol messages.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Input shorter than a nonce plus an authentication tag.
    #[error("ciphertext too short: {len} bytes")]
    Truncated { len: usize },

    /// The cipher refused to encrypt the message.
    #[error("encryption failed")]
    Encryption,

    /// Authentication failed: wrong key or tampered bytes.
    #[error("decryption failed")]
    Decryption,

    /// The plaintext is not the expected JSON document.
    #[error("invalid message body")]
    Json(#[source] serde_json::Error),
}

/// Errors raised by a single command exchange with a smart plug.
#[derive(Debug, thiserror::Error)]
pub enum SmartPlugError {
    /// The TCP connection could not be opened.
    #[error("failed to connect to device")]
    Connect(#[source] std::io::Error),

    /// Writing the request or reading the reply failed.
    #[error("device I/O failed")]
    Io(#[source] std::io::Error),

    /// The exchange did not finish in time.
    #[error("device did not answer within {0:?}")]
    Timeout(Duration),

    /// The request could not be encoded.
    #[error("failed to encode command")]
    Encode(#[source] CodecError),

    /// The device closed the connection without replying.
    #[error("device closed the connection without replying")]
    NoResponse,

    /// The reply could not be decrypted or parsed.
    #[error("unreadable device reply")]
    Response(#[source] CodecError),
}

impl SmartPlugError {
    /// Convert into the [`FailureReason`] recorded for the target.
    #[must_use]
    pub fn into_domain(self) -> FailureReason {
        match self {
            Self::Connect(_) | Self::Io(_) | Self::Encode(_) => FailureReason::ConnectionFailed,
            Self::Timeout(_) => FailureReason::Timeout,
            Self::NoResponse => FailureReason::Rejected,
            Self::Response(_) => FailureReason::MalformedResponse,
        }
    }
}

impl From<SmartPlugError> for FailureReason {
    fn from(err: SmartPlugError) -> Self {
        err.into_domain()
    }
}
