//! Binary decoder for EnvSensor notification payloads.
//!
//! Every notification on either channel is exactly one IEEE-754
//! single-precision float, little-endian:
//!
//! ```text
//! byte 0..4 : f32 LE   (°C on 0x2A6E, %RH on 0x2A6F)
//! ```
//!
//! All functions here are pure and safe to call from any async or sync context.

use crate::error::DecodeError;
use crate::protocol::PAYLOAD_LEN;
use crate::types::{Channel, Notification, Reading};

/// Decode a 4-byte little-endian `f32` payload.
///
/// Payloads of any other length are rejected, as are bit patterns that
/// decode to NaN or ±∞.
pub fn decode_value(payload: &[u8]) -> Result<f32, DecodeError> {
    let bytes: [u8; PAYLOAD_LEN] = payload
        .try_into()
        .map_err(|_| DecodeError::Length(payload.len()))?;
    let value = f32::from_le_bytes(bytes);
    if !value.is_finite() {
        return Err(DecodeError::NonFinite(value.to_bits()));
    }
    Ok(value)
}

/// Decode a notification into a [`Reading`] tagged with its source channel.
pub fn decode_notification(notif: &Notification) -> Result<Reading, DecodeError> {
    let channel = Channel::from_characteristic(notif.characteristic)
        .ok_or(DecodeError::UnknownCharacteristic(notif.characteristic))?;
    let value = decode_value(&notif.value)?;
    Ok(Reading { channel, value })
}

/// Encode a value the way the sensor firmware does.  Used by the simulator
/// and tests.
pub fn encode_value(value: f32) -> [u8; PAYLOAD_LEN] {
    value.to_le_bytes()
}
