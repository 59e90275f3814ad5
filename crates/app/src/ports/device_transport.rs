//! Device transport port: one direct command exchange with one device.

use std::future::Future;

use toad_domain::address::DeviceAddress;
use toad_domain::outcome::CommandResult;
use toad_domain::relay::DeviceCommand;

/// Sends a [`DeviceCommand`] to a device and classifies the outcome.
///
/// Implementations never return errors: every transport or protocol failure
/// is folded into a failed [`CommandResult`] for that address. A single
/// attempt is made; retries are the caller's business.
pub trait DeviceTransport: Send + Sync {
    fn send(
        &self,
        address: &DeviceAddress,
        command: &DeviceCommand,
    ) -> impl Future<Output = CommandResult> + Send;
}

impl<T: DeviceTransport> DeviceTransport for std::sync::Arc<T> {
    fn send(
        &self,
        address: &DeviceAddress,
        command: &DeviceCommand,
    ) -> impl Future<Output = CommandResult> + Send {
        (**self).send(address, command)
    }
}
