//! [`RegistrySource`] backed by an etcd prefix range read.

use std::future::Future;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use toad_app::ports::{RegistryEntry, RegistrySource};
use toad_domain::error::ToadError;

use crate::config::EtcdConfig;
use crate::error::EtcdError;

const RANGE_PATH: &str = "/v3/kv/range";

/// Reads the registry from etcd over its JSON gateway.
#[derive(Debug, Clone)]
pub struct EtcdRegistry {
    client: reqwest::Client,
    url: String,
    prefix: String,
}

#[derive(Debug, Serialize)]
struct RangeRequest {
    key: String,
    range_end: String,
}

#[derive(Debug, Deserialize)]
struct RangeResponse {
    #[serde(default)]
    kvs: Vec<KeyValue>,
}

#[derive(Debug, Deserialize)]
struct KeyValue {
    key: String,
    #[serde(default)]
    value: String,
}

impl EtcdRegistry {
    /// Build a registry reader for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`EtcdError::Request`] if the HTTP client cannot be built.
    pub fn new(config: &EtcdConfig) -> Result<Self, EtcdError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(EtcdError::Request)?;
        Ok(Self {
            client,
            url: format!("{}{RANGE_PATH}", config.endpoint.trim_end_matches('/')),
            prefix: format!("{}/", config.namespace.trim_end_matches('/')),
        })
    }

    /// Read every entry below the namespace.
    ///
    /// Entries that cannot be decoded are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`EtcdError::Request`] when the gateway is unreachable or
    /// answers garbage, and [`EtcdError::Status`] on a non-success status.
    pub async fn list(&self) -> Result<Vec<RegistryEntry>, EtcdError> {
        let request = RangeRequest {
            key: STANDARD.encode(&self.prefix),
            range_end: STANDARD.encode(prefix_end(self.prefix.as_bytes())),
        };
        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(EtcdError::Request)?;
        let status = response.status();
        if !status.is_success() {
            return Err(EtcdError::Status(status));
        }
        let range: RangeResponse = response.json().await.map_err(EtcdError::Request)?;

        let entries: Vec<_> = range
            .kvs
            .into_iter()
            .filter_map(|kv| match self.decode(&kv) {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::warn!(key = %kv.key, %err, "skipping undecodable etcd entry");
                    None
                }
            })
            .collect();
        tracing::trace!(count = entries.len(), prefix = %self.prefix, "etcd range read");
        Ok(entries)
    }

    fn decode(&self, kv: &KeyValue) -> Result<RegistryEntry, EtcdError> {
        let key = decode_text(&kv.key)?;
        let value = decode_text(&kv.value)?;
        let id = key
            .strip_prefix(&self.prefix)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| EtcdError::ForeignKey(key.clone()))?;
        Ok(RegistryEntry::new(id, value.trim()))
    }
}

impl RegistrySource for EtcdRegistry {
    fn fetch(&self) -> impl Future<Output = Result<Vec<RegistryEntry>, ToadError>> + Send {
        async move { self.list().await.map_err(EtcdError::into_domain) }
    }
}

fn decode_text(encoded: &str) -> Result<String, EtcdError> {
    let bytes = STANDARD.decode(encoded).map_err(EtcdError::Base64)?;
    String::from_utf8(bytes).map_err(EtcdError::Utf8)
}

/// The smallest key greater than every key starting with `prefix`.
fn prefix_end(prefix: &[u8]) -> Vec<u8> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return end;
        }
    }
    // Every byte is 0xff: read to the end of the keyspace.
    vec![0]
}
