//! Inbound command: the decoded body of a bus message.
//!
//! Bus payload shape:
//!
//! ```json
//! {"payload": "{\"status\": 1}", "subtopics": ["row/0", "column/2"]}
//! ```
//!
//! `payload` carries JSON-encoded text describing the command; `subtopics`
//! is optional.

use serde_json::Value;

use crate::error::ValidationError;
use crate::relay::RelayState;

/// Command decoded from a bus payload, before target resolution.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InboundCommand {
    /// Requested relay state; `None` when the payload carries no `status`.
    pub state: Option<RelayState>,
    /// Explicit sub-targets appended to the topic query.
    pub subtopics: Option<Vec<String>>,
}

impl InboundCommand {
    /// Decode a raw bus payload.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::MalformedJson`] when the outer body or the inner
    ///   `payload` text is not JSON
    /// - [`ValidationError::MissingPayload`] when `payload` is absent
    /// - [`ValidationError::InvalidPayload`] when `payload` is neither text
    ///   nor an object
    /// - [`ValidationError::InvalidStatus`] for a `status` other than 0/1
    /// - [`ValidationError::InvalidSubtopics`] when `subtopics` is not a list
    ///   of strings
    pub fn parse(payload: &[u8]) -> Result<Self, ValidationError> {
        let body: Value = serde_json::from_slice(payload)?;

        let inner = match body.get("payload") {
            None | Some(Value::Null) => return Err(ValidationError::MissingPayload),
            Some(Value::String(text)) => serde_json::from_str::<Value>(text)?,
            Some(object @ Value::Object(_)) => object.clone(),
            Some(_) => return Err(ValidationError::InvalidPayload),
        };

        let state = match inner.get("status") {
            Some(status) => RelayState::from_status(status)?,
            None => None,
        };

        let subtopics = match body.get("subtopics") {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => Some(
                items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
                    .ok_or(ValidationError::InvalidSubtopics)?,
            ),
            Some(_) => return Err(ValidationError::InvalidSubtopics),
        };

        Ok(Self { state, subtopics })
    }

    /// The relay state to send; `Off` when none was requested.
    #[must_use]
    pub fn resolved_state(&self) -> RelayState {
        self.state.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_status_from_encoded_payload() {
        let cmd = InboundCommand::parse(br#"{"payload": "{\"status\": 1}"}"#).unwrap();
        assert_eq!(cmd.state, Some(RelayState::On));
        assert_eq!(cmd.subtopics, None);
    }

    #[test]
    fn should_accept_embedded_payload_object() {
        let cmd = InboundCommand::parse(br#"{"payload": {"status": "0"}}"#).unwrap();
        assert_eq!(cmd.state, Some(RelayState::Off));
    }

    #[test]
    fn should_default_to_off_when_status_absent() {
        let cmd = InboundCommand::parse(br#"{"payload": "{}"}"#).unwrap();
        assert_eq!(cmd.state, None);
        assert_eq!(cmd.resolved_state(), RelayState::Off);
    }

    #[test]
    fn should_parse_subtopics() {
        let cmd =
            InboundCommand::parse(br#"{"payload": "{}", "subtopics": ["row/1", "w.r0.c0"]}"#)
                .unwrap();
        assert_eq!(
            cmd.subtopics,
            Some(vec!["row/1".to_string(), "w.r0.c0".to_string()])
        );
    }

    #[test]
    fn should_report_parser_message_for_malformed_body() {
        let expected = serde_json::from_slice::<Value>(b"not json")
            .unwrap_err()
            .to_string();
        let err = InboundCommand::parse(b"not json").unwrap_err();
        assert!(matches!(err, ValidationError::MalformedJson(_)));
        assert_eq!(err.to_string(), expected);
    }

    #[test]
    fn should_report_parser_message_for_malformed_inner_payload() {
        let err = InboundCommand::parse(br#"{"payload": "{status"}"#).unwrap_err();
        assert!(matches!(err, ValidationError::MalformedJson(_)));
    }

    #[test]
    fn should_reject_missing_payload() {
        let err = InboundCommand::parse(br#"{"subtopics": []}"#).unwrap_err();
        assert!(matches!(err, ValidationError::MissingPayload));
    }

    #[test]
    fn should_reject_non_text_payload() {
        let err = InboundCommand::parse(br#"{"payload": 12}"#).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidPayload));
    }

    #[test]
    fn should_reject_invalid_status() {
        let err = InboundCommand::parse(br#"{"payload": "{\"status\": \"on\"}"}"#).unwrap_err();
        assert_eq!(err.to_string(), "Invalid payload status: 'on'");
    }

    #[test]
    fn should_reject_non_string_subtopics() {
        let err = InboundCommand::parse(br#"{"payload": "{}", "subtopics": [1]}"#).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidSubtopics));

        let err = InboundCommand::parse(br#"{"payload": "{}", "subtopics": "row/1"}"#).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidSubtopics));
    }
}
