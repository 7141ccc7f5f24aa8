use std::fmt;

use uuid::Uuid;

use crate::protocol::{HUMIDITY_CHARACTERISTIC, TEMPERATURE_CHARACTERISTIC};

/// One of the two sensor channels carried by the EnvSensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Air temperature in °C.
    Temperature,
    /// Relative humidity in %.
    Humidity,
}

impl Channel {
    /// Map a characteristic UUID to its channel.
    ///
    /// Returns `None` for characteristics that carry neither channel.
    pub fn from_characteristic(uuid: Uuid) -> Option<Self> {
        if uuid == TEMPERATURE_CHARACTERISTIC {
            Some(Channel::Temperature)
        } else if uuid == HUMIDITY_CHARACTERISTIC {
            Some(Channel::Humidity)
        } else {
            None
        }
    }

    /// Map a textual characteristic identifier to its channel.
    ///
    /// Comparison is case-insensitive: `"00002A6E-…"` and `"00002a6e-…"`
    /// both resolve to [`Channel::Temperature`].
    pub fn from_identifier(id: &str) -> Option<Self> {
        Uuid::parse_str(id.trim())
            .ok()
            .and_then(Self::from_characteristic)
    }

    /// Display unit suffix.
    pub fn unit(self) -> &'static str {
        match self {
            Channel::Temperature => "°C",
            Channel::Humidity => "%",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Temperature => f.write_str("Temperature"),
            Channel::Humidity => f.write_str("Humidity"),
        }
    }
}

/// A single decoded sensor value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub channel: Channel,
    pub value: f32,
}

/// A raw notification as delivered by the transport, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Source characteristic.
    pub characteristic: Uuid,
    /// Raw payload bytes.
    pub value: Vec<u8>,
}

/// A peripheral seen during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    /// Advertised local name.
    pub name: String,
    /// Platform BLE identifier.
    /// • macOS / Windows: a UUID string
    /// • Linux: a Bluetooth MAC address (`AA:BB:CC:DD:EE:FF`)
    pub address: String,
}

/// Lifecycle of a [`crate::session::Session`].
///
/// ```text
/// Disconnected ──start──▶ Scanning ──subscribed──▶ Connected ──stop / link lost──▶ Disconnected
///      ▲                     │                        │
///      └──── start ──── Error(reason) ◀───── failure ─┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Scanning,
    Connected,
    Error(String),
}

impl SessionState {
    /// `true` when [`crate::session::Session::start`] may be called.
    pub fn can_start(&self) -> bool {
        matches!(self, SessionState::Disconnected | SessionState::Error(_))
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Disconnected => f.write_str("Disconnected"),
            SessionState::Scanning => f.write_str("Scanning…"),
            SessionState::Connected => f.write_str("Connected"),
            SessionState::Error(reason) => write!(f, "Error: {reason}"),
        }
    }
}

/// Events posted from the session worker to the UI thread.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorEvent {
    /// The session moved to a new state.
    State(SessionState),
    /// A successfully decoded reading.  Malformed notifications never
    /// produce this event.
    Reading(Reading),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_match_case_insensitively() {
        assert_eq!(
            Channel::from_identifier("00002A6E-0000-1000-8000-00805F9B34FB"),
            Some(Channel::Temperature)
        );
        assert_eq!(
            Channel::from_identifier("00002a6f-0000-1000-8000-00805f9b34fb"),
            Some(Channel::Humidity)
        );
        assert_eq!(
            Channel::from_identifier("0000180d-0000-1000-8000-00805f9b34fb"),
            None
        );
        assert_eq!(Channel::from_identifier("not-a-uuid"), None);
    }

    #[test]
    fn only_idle_states_can_start() {
        assert!(SessionState::Disconnected.can_start());
        assert!(SessionState::Error("device not found".into()).can_start());
        assert!(!SessionState::Scanning.can_start());
        assert!(!SessionState::Connected.can_start());
    }

    #[test]
    fn state_display() {
        assert_eq!(
            SessionState::Error("device not found".into()).to_string(),
            "Error: device not found"
        );
        assert_eq!(SessionState::Connected.to_string(), "Connected");
    }
}
