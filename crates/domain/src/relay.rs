//! Relay state and the direct command sent to a smart plug.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// Desired on/off state of a plug's relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayState {
    On,
    #[default]
    Off,
}

impl RelayState {
    /// Read the `status` field of an inbound command.
    ///
    /// Accepts the integers `0`/`1` and strings that trim to `"0"`/`"1"`.
    /// `null` means "no state requested".
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidStatus`] naming the value for
    /// anything else.
    pub fn from_status(value: &Value) -> Result<Option<Self>, ValidationError> {
        let code = match value {
            Value::Null => return Ok(None),
            Value::Number(number) => number.as_i64(),
            Value::String(text) => text.trim().parse::<i64>().ok(),
            _ => None,
        };
        match code {
            Some(0) => Ok(Some(Self::Off)),
            Some(1) => Ok(Some(Self::On)),
            _ => {
                let shown = match value {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                Err(ValidationError::InvalidStatus(shown))
            }
        }
    }

    #[must_use]
    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }

    /// Numeric value used on the device wire.
    #[must_use]
    pub fn code(self) -> u8 {
        u8::from(self.is_on())
    }
}

impl From<bool> for RelayState {
    fn from(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }
}

impl std::fmt::Display for RelayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::On => f.write_str("on"),
            Self::Off => f.write_str("off"),
        }
    }
}

/// Plaintext command understood by a smart plug:
/// `{"system":{"set_relay_state":{"state":0|1}}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceCommand {
    pub system: SystemCommand,
}

/// The `system` section of a [`DeviceCommand`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SystemCommand {
    pub set_relay_state: SetRelayState,
}

/// The `set_relay_state` section of a [`DeviceCommand`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetRelayState {
    pub state: u8,
}

impl DeviceCommand {
    /// Command switching the relay to `state`.
    #[must_use]
    pub fn set_relay_state(state: RelayState) -> Self {
        Self {
            system: SystemCommand {
                set_relay_state: SetRelayState { state: state.code() },
            },
        }
    }

    /// The relay state this command requests, if the wire value is valid.
    #[must_use]
    pub fn relay_state(&self) -> Option<RelayState> {
        match self.system.set_relay_state.state {
            0 => Some(RelayState::Off),
            1 => Some(RelayState::On),
            _ => None,
        }
    }
}
