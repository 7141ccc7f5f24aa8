use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::types::SessionState;

/// Why a notification payload could not be turned into a reading.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("expected a 4-byte payload, got {0} bytes")]
    Length(usize),

    /// The payload decoded to NaN or ±∞.  Carries the raw bit pattern.
    #[error("payload is not a finite float (bits {0:#010x})")]
    NonFinite(u32),

    #[error("notification from unknown characteristic {0}")]
    UnknownCharacteristic(Uuid),
}

/// Errors raised while discovering, connecting to, or talking to the sensor.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SensorError {
    #[error("device not found")]
    DeviceNotFound,

    #[error("no Bluetooth adapter found")]
    NoAdapter,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("connection timed out after {0:?}")]
    Timeout(Duration),

    #[error("characteristic {0} not found")]
    CharacteristicNotFound(Uuid),

    #[error("cannot start a session while {0}")]
    InvalidState(SessionState),
}

impl From<btleplug::Error> for SensorError {
    fn from(e: btleplug::Error) -> Self {
        match e {
            btleplug::Error::TimedOut(after) => SensorError::Timeout(after),
            other => SensorError::Connection(other.to_string()),
        }
    }
}
