//! The seam between the session state machine and a BLE client library.
//!
//! [`crate::sensor_client::SensorClient`] implements these traits on top of
//! `btleplug`; [`crate::simulate::SimulatedTransport`] and
//! [`crate::ble_mock::MockTransport`] implement them without hardware.
//!
//! Notifications are pulled with [`Link::next_notification`] instead of
//! being pushed into a callback, so the session decides on which task (and
//! thread) they are handled.
#![allow(async_fn_in_trait)]

use std::time::Duration;

use uuid::Uuid;

use crate::error::SensorError;
use crate::types::{DiscoveredDevice, Notification};

/// Discovers and connects to peripherals.
pub trait Transport {
    type Link: Link;

    /// Scan for `window` and return every named peripheral seen.
    async fn discover(&mut self, window: Duration) -> Result<Vec<DiscoveredDevice>, SensorError>;

    /// Connect to `device`, failing with [`SensorError::Timeout`] after `timeout`.
    async fn connect(
        &mut self,
        device: &DiscoveredDevice,
        timeout: Duration,
    ) -> Result<Self::Link, SensorError>;
}

/// An established connection to one peripheral.
pub trait Link {
    async fn subscribe(&mut self, characteristic: Uuid) -> Result<(), SensorError>;

    async fn unsubscribe(&mut self, characteristic: Uuid) -> Result<(), SensorError>;

    /// Wait for the next notification.  `None` means the link is closed and
    /// no further notifications will arrive.
    ///
    /// Must be cancel-safe: it is raced against the stop signal.
    async fn next_notification(&mut self) -> Option<Notification>;

    async fn is_connected(&mut self) -> bool;

    async fn disconnect(&mut self) -> Result<(), SensorError>;
}
