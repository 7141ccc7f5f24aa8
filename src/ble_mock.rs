use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use uuid::Uuid;

use crate::error::SensorError;
use crate::parse::encode_value;
use crate::transport::{Link, Transport};
use crate::types::{DiscoveredDevice, Notification};

/// Calls observed by a [`MockTransport`] and its links.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MockLog {
    pub discovered: usize,
    pub connected_to: Option<String>,
    pub subscribed: Vec<Uuid>,
    pub unsubscribed: Vec<Uuid>,
    pub disconnected: bool,
}

/// Scripted in-memory transport.
#[derive(Clone, Debug, Default)]
pub struct MockTransport {
    pub devices: Vec<DiscoveredDevice>,
    /// Error returned by `connect`, if any.
    pub connect_error: Option<SensorError>,
    /// `subscribe` fails for this characteristic.
    pub fail_subscribe: Option<Uuid>,
    /// Delivered in order once connected.
    pub notifications: Vec<Notification>,
    /// After the script is exhausted, keep the link open instead of closing it.
    pub hold_open: bool,
    /// Set by [`MockTransport::drop_link`]; shared with every link.
    pub link_dropped: Arc<AtomicBool>,
    pub log: Arc<Mutex<MockLog>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport that advertises one EnvSensor.
    pub fn with_sensor() -> Self {
        Self {
            devices: vec![
                DiscoveredDevice {
                    name: "Thermo-Beacon".to_string(),
                    address: "AA:BB:CC:00:00:01".to_string(),
                },
                DiscoveredDevice {
                    name: crate::protocol::DEVICE_NAME.to_string(),
                    address: "AA:BB:CC:00:00:02".to_string(),
                },
            ],
            ..Self::default()
        }
    }

    /// Simulate the peripheral going out of range.  Links report
    /// disconnected from the next liveness check on.
    pub fn drop_link(&self) {
        self.link_dropped.store(true, Ordering::SeqCst);
    }

    /// Queue a well-formed notification carrying `value`.
    pub fn push_value(&mut self, characteristic: Uuid, value: f32) -> &mut Self {
        self.push_raw(characteristic, encode_value(value).to_vec())
    }

    /// Queue a notification with an arbitrary payload.
    pub fn push_raw(&mut self, characteristic: Uuid, value: Vec<u8>) -> &mut Self {
        self.notifications.push(Notification { characteristic, value });
        self
    }
}

impl Transport for MockTransport {
    type Link = MockLink;

    async fn discover(&mut self, _window: Duration) -> Result<Vec<DiscoveredDevice>, SensorError> {
        if let Ok(mut log) = self.log.lock() {
            log.discovered += 1;
        }
        Ok(self.devices.clone())
    }

    async fn connect(
        &mut self,
        device: &DiscoveredDevice,
        _timeout: Duration,
    ) -> Result<MockLink, SensorError> {
        if let Some(e) = self.connect_error.clone() {
            return Err(e);
        }
        if let Ok(mut log) = self.log.lock() {
            log.connected_to = Some(device.address.clone());
        }
        Ok(MockLink {
            queue: self.notifications.iter().cloned().collect(),
            hold_open: self.hold_open,
            fail_subscribe: self.fail_subscribe,
            connected: true,
            dropped: Arc::clone(&self.link_dropped),
            log: Arc::clone(&self.log),
        })
    }
}

/// Link produced by [`MockTransport`].
#[derive(Debug)]
pub struct MockLink {
    queue: VecDeque<Notification>,
    hold_open: bool,
    fail_subscribe: Option<Uuid>,
    connected: bool,
    dropped: Arc<AtomicBool>,
    log: Arc<Mutex<MockLog>>,
}

impl Link for MockLink {
    async fn subscribe(&mut self, characteristic: Uuid) -> Result<(), SensorError> {
        if self.fail_subscribe == Some(characteristic) {
            return Err(SensorError::CharacteristicNotFound(characteristic));
        }
        if let Ok(mut log) = self.log.lock() {
            log.subscribed.push(characteristic);
        }
        Ok(())
    }

    async fn unsubscribe(&mut self, characteristic: Uuid) -> Result<(), SensorError> {
        if let Ok(mut log) = self.log.lock() {
            log.unsubscribed.push(characteristic);
        }
        Ok(())
    }

    async fn next_notification(&mut self) -> Option<Notification> {
        if !self.connected {
            return None;
        }
        match self.queue.pop_front() {
            Some(n) => Some(n),
            None if self.hold_open => std::future::pending().await,
            None => None,
        }
    }

    async fn is_connected(&mut self) -> bool {
        self.connected && !self.dropped.load(Ordering::SeqCst)
    }

    async fn disconnect(&mut self) -> Result<(), SensorError> {
        self.connected = false;
        if let Ok(mut log) = self.log.lock() {
            log.disconnected = true;
        }
        Ok(())
    }
}
