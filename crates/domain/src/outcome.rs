//! Command outcomes: what happened when a device was commanded.

use std::fmt;

use crate::address::DeviceAddress;

/// Why a command to one device did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The device could not be reached or the write failed.
    ConnectionFailed,
    /// The device did not answer within the per-command timeout.
    Timeout,
    /// The device closed the connection without answering.
    Rejected,
    /// The device answered with bytes that do not decrypt to JSON.
    MalformedResponse,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ConnectionFailed => "connection failed",
            Self::Timeout => "timeout",
            Self::Rejected => "rejected",
            Self::MalformedResponse => "malformed response",
        })
    }
}

/// Outcome of commanding a single device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub address: DeviceAddress,
    pub success: bool,
    pub reason: Option<FailureReason>,
}

impl CommandResult {
    #[must_use]
    pub fn succeeded(address: DeviceAddress) -> Self {
        Self {
            address,
            success: true,
            reason: None,
        }
    }

    #[must_use]
    pub fn failed(address: DeviceAddress, reason: FailureReason) -> Self {
        Self {
            address,
            success: false,
            reason: Some(reason),
        }
    }
}

/// Aggregate outcome of one inbound message, in completion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub succeeded: Vec<DeviceAddress>,
    pub failed: Vec<CommandResult>,
}

impl DispatchReport {
    /// Record one device outcome.
    pub fn record(&mut self, result: CommandResult) {
        if result.success {
            self.succeeded.push(result.address);
        } else {
            self.failed.push(result);
        }
    }

    /// Number of devices commanded.
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

impl FromIterator<CommandResult> for DispatchReport {
    fn from_iter<I: IntoIterator<Item = CommandResult>>(iter: I) -> Self {
        let mut report = Self::default();
        for result in iter {
            report.record(result);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_reasons() {
        assert_eq!(FailureReason::ConnectionFailed.to_string(), "connection failed");
        assert_eq!(FailureReason::Timeout.to_string(), "timeout");
        assert_eq!(FailureReason::Rejected.to_string(), "rejected");
        assert_eq!(
            FailureReason::MalformedResponse.to_string(),
            "malformed response"
        );
    }

    #[test]
    fn should_split_report_by_outcome() {
        let ok = DeviceAddress::new("a", 1);
        let bad = DeviceAddress::new("b", 1);
        let report: DispatchReport = [
            CommandResult::succeeded(ok.clone()),
            CommandResult::failed(bad.clone(), FailureReason::Timeout),
        ]
        .into_iter()
        .collect();

        assert_eq!(report.succeeded, vec![ok]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].address, bad);
        assert_eq!(report.failed[0].reason, Some(FailureReason::Timeout));
        assert_eq!(report.total(), 2);
    }
}
