//! etcd adapter error types.

use toad_domain::error::ToadError;

/// Errors specific to the etcd adapter.
#[derive(Debug, thiserror::Error)]
pub enum EtcdError {
    /// The HTTP request failed or its body could not be read.
    #[error("etcd request failed")]
    Request(#[source] reqwest::Error),

    /// The gateway answered with a non-success status.
    #[error("etcd answered with status {0}")]
    Status(reqwest::StatusCode),

    /// A key or value is not valid base64.
    #[error("invalid base64 in etcd entry")]
    Base64(#[source] base64::DecodeError),

    /// A key or value is not valid UTF-8.
    #[error("non UTF-8 etcd entry")]
    Utf8(#[source] std::string::FromUtf8Error),

    /// A key outside the configured namespace.
    #[error("key {0:?} is outside the registry namespace")]
    ForeignKey(String),
}

impl EtcdError {
    /// Convert into a [`ToadError::Registry`] for propagation across port
    /// boundaries.
    pub fn into_domain(self) -> ToadError {
        ToadError::Registry(Box::new(self))
    }
}

impl From<EtcdError> for ToadError {
    fn from(err: EtcdError) -> Self {
        err.into_domain()
    }
}
