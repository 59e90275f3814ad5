//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`ToadError`]
//! when crossing a port boundary.

/// Boxed error produced by an adapter.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error surfaced across port boundaries.
#[derive(Debug, thiserror::Error)]
pub enum ToadError {
    /// An inbound command failed validation.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// The registry store could not be read.
    #[error("registry error")]
    Registry(#[source] BoxedError),

    /// The message bus rejected an operation.
    #[error("bus error")]
    Bus(#[source] BoxedError),
}

/// Reasons an inbound bus message is rejected before any device is contacted.
///
/// The `Display` output is the human-readable reason reported to operators.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// The topic is not below the configured base prefix.
    #[error("Invalid topic: {topic}, it should start with {expected}")]
    InvalidTopic {
        /// The topic that was received.
        topic: String,
        /// The configured base prefix.
        expected: String,
    },

    /// The outer or inner payload is not valid JSON.
    #[error("{0}")]
    MalformedJson(#[from] serde_json::Error),

    /// The outer payload has no `payload` field.
    #[error("Missing payload, check the documentation for more info")]
    MissingPayload,

    /// The `payload` field is neither JSON text nor a JSON object.
    #[error("Invalid payload: expected JSON-encoded text")]
    InvalidPayload,

    /// The `status` field is something other than `0` or `1`.
    #[error("Invalid payload status: '{0}'")]
    InvalidStatus(String),

    /// The `subtopics` field is not a list of strings.
    #[error("Invalid subtopics: expected a list of strings")]
    InvalidSubtopics,

    /// Neither the topic nor the payload names a target.
    #[error("No targets specified")]
    NoTargets,
}
