//! Registry source port: read access to the distributed device registry.

use std::future::Future;

use toad_domain::error::ToadError;

/// One key/value pair read from the registry namespace.
///
/// `id` is the key with the namespace stripped; `address` is the raw value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub id: String,
    pub address: String,
}

impl RegistryEntry {
    pub fn new(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
        }
    }
}

/// Fetches the full registry namespace in one call.
pub trait RegistrySource: Send + Sync {
    /// Read every entry under the configured namespace.
    fn fetch(&self) -> impl Future<Output = Result<Vec<RegistryEntry>, ToadError>> + Send;
}

impl<T: RegistrySource> RegistrySource for std::sync::Arc<T> {
    fn fetch(&self) -> impl Future<Output = Result<Vec<RegistryEntry>, ToadError>> + Send {
        (**self).fetch()
    }
}
