//! Registry snapshot: an immutable map from grid identifier to device
//! address, valid at the instant it was fetched.

use std::collections::HashMap;

use crate::address::DeviceAddress;
use crate::grid::GridId;
use crate::time::Timestamp;

/// Immutable view of the device registry.
///
/// A snapshot is built completely before it is published and is never
/// mutated afterwards; a refresh replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    entries: HashMap<GridId, DeviceAddress>,
    fetched_at: Option<Timestamp>,
}

impl RegistrySnapshot {
    /// The snapshot in effect before the first successful refresh.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from fetched entries.
    ///
    /// Later duplicates of the same identifier win.
    pub fn new(
        entries: impl IntoIterator<Item = (GridId, DeviceAddress)>,
        fetched_at: Timestamp,
    ) -> Self {
        Self {
            entries: entries.into_iter().collect(),
            fetched_at: Some(fetched_at),
        }
    }

    /// Address registered for `id`, if any.
    #[must_use]
    pub fn get(&self, id: &GridId) -> Option<&DeviceAddress> {
        self.entries.get(id)
    }

    /// When the entries were fetched; `None` for the initial empty snapshot.
    #[must_use]
    pub fn fetched_at(&self) -> Option<Timestamp> {
        self.fetched_at
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GridId, &DeviceAddress)> {
        self.entries.iter()
    }
}
