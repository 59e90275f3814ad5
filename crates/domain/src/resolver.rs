//! Topic/target resolver: turns a bus message into the addresses to command.
//!
//! Pure: no IO, reads only the registry snapshot it is handed.
//!
//! A topic `<base>/<query>` names its targets through the query:
//!
//! | Query | Targets |
//! |-------|---------|
//! | `row/<r>` | every column of row `r` |
//! | `column/<c>` | every row of column `c` |
//! | anything else | the single identifier `<query>` |
//!
//! When the payload carries `subtopics`, each one is appended to the query
//! and classified on its own.

use crate::address::DeviceAddress;
use crate::command::InboundCommand;
use crate::error::ValidationError;
use crate::grid::{GridDimensions, GridId};
use crate::registry::RegistrySnapshot;
use crate::relay::RelayState;

const ROW_SELECTOR: &str = "row";
const COLUMN_SELECTOR: &str = "column";

/// Addresses to command for one inbound message, in expansion order, with
/// the relay state to send to all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTargets {
    pub addresses: Vec<DeviceAddress>,
    pub state: RelayState,
}

/// How a sub-query selects devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector<'a> {
    Row(&'a str),
    Column(&'a str),
    Device(&'a str),
}

impl<'a> Selector<'a> {
    /// Classify a sub-query by its trailing `row/<r>` or `column/<c>` tokens.
    #[must_use]
    pub fn classify(sub_query: &'a str) -> Self {
        if let Some((head, index)) = sub_query.rsplit_once('/') {
            match head.rsplit('/').next() {
                Some(ROW_SELECTOR) => return Self::Row(index),
                Some(COLUMN_SELECTOR) => return Self::Column(index),
                _ => {}
            }
        }
        Self::Device(sub_query)
    }
}

/// Resolves bus topics below a base prefix against a grid of smart plugs.
#[derive(Debug, Clone)]
pub struct TopicResolver {
    base_topic: String,
    grid: GridDimensions,
}

impl TopicResolver {
    /// Create a resolver for topics below `base_topic`.
    ///
    /// Trailing `/` and `#` characters are ignored, so `base`, `base/` and
    /// `base/#` all name the same prefix.
    pub fn new(base_topic: impl Into<String>, grid: GridDimensions) -> Self {
        let base_topic = base_topic.into();
        let base_topic = base_topic.trim_end_matches(['/', '#']).to_string();
        Self { base_topic, grid }
    }

    #[must_use]
    pub fn base_topic(&self) -> &str {
        &self.base_topic
    }

    #[must_use]
    pub fn grid(&self) -> GridDimensions {
        self.grid
    }

    /// Wildcard filter matching every topic this resolver accepts.
    #[must_use]
    pub fn subscription(&self) -> String {
        format!("{}/#", self.base_topic)
    }

    /// Strip the base prefix (and its separator) from `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTopic`] when `topic` is not the base
    /// prefix or below it.
    pub fn query<'t>(&self, topic: &'t str) -> Result<&'t str, ValidationError> {
        let rest = match topic.strip_prefix(self.base_topic.as_str()) {
            Some("") => return Ok(""),
            Some(rest) => rest.strip_prefix('/'),
            None => None,
        };
        rest.ok_or_else(|| ValidationError::InvalidTopic {
            topic: topic.to_string(),
            expected: self.base_topic.clone(),
        })
    }

    /// Resolve a bus message into target addresses and a relay state.
    ///
    /// Identifiers missing from `snapshot` are skipped; an empty address list
    /// is a valid result.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for a foreign topic, a malformed
    /// payload, an invalid status, or when no target is named at all.
    pub fn resolve(
        &self,
        topic: &str,
        payload: &[u8],
        snapshot: &RegistrySnapshot,
    ) -> Result<ResolvedTargets, ValidationError> {
        let query = self.query(topic)?;
        let command = InboundCommand::parse(payload)?;

        let sub_queries = match &command.subtopics {
            Some(subtopics) => subtopics.iter().map(|st| format!("{query}{st}")).collect(),
            None if query.is_empty() => return Err(ValidationError::NoTargets),
            None => vec![query.to_string()],
        };

        let mut addresses = Vec::new();
        for sub_query in &sub_queries {
            for id in self.expand(Selector::classify(sub_query)) {
                match snapshot.get(&id) {
                    Some(address) => addresses.push(address.clone()),
                    None => tracing::trace!(%id, "identifier not in registry, skipping"),
                }
            }
        }

        Ok(ResolvedTargets {
            addresses,
            state: command.resolved_state(),
        })
    }

    fn expand<'a>(&self, selector: Selector<'a>) -> Box<dyn Iterator<Item = GridId> + 'a> {
        match selector {
            Selector::Row(row) => Box::new(self.grid.row(row)),
            Selector::Column(column) => Box::new(self.grid.column(column)),
            Selector::Device(id) => Box::new(std::iter::once(GridId::new(id))),
        }
    }
}
