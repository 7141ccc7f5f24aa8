//! GATT UUIDs, device constants, and display bounds for the EnvSensor.
//!
//! The sensor exposes standard Bluetooth SIG 16-bit UUIDs expanded into the
//! base namespace `0000XXXX-0000-1000-8000-00805f9b34fb`.

use std::time::Duration;

use uuid::Uuid;

// ── Service ──────────────────────────────────────────────────────────────────

/// Primary GATT service UUID advertised by the EnvSensor firmware.
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x0000180d_0000_1000_8000_00805f9b34fb);

// ── Characteristics ───────────────────────────────────────────────────────────

/// Temperature characteristic (`0x2A6E`), notified as a 4-byte LE `f32` in °C.
pub const TEMPERATURE_CHARACTERISTIC: Uuid =
    Uuid::from_u128(0x00002a6e_0000_1000_8000_00805f9b34fb);

/// Humidity characteristic (`0x2A6F`), notified as a 4-byte LE `f32` in %RH.
pub const HUMIDITY_CHARACTERISTIC: Uuid =
    Uuid::from_u128(0x00002a6f_0000_1000_8000_00805f9b34fb);

/// Both subscribed characteristics, in subscription order.
pub const SENSOR_CHARACTERISTICS: [Uuid; 2] =
    [TEMPERATURE_CHARACTERISTIC, HUMIDITY_CHARACTERISTIC];

// ── Device ────────────────────────────────────────────────────────────────────

/// Advertised local name of the target peripheral.  Matched exactly.
pub const DEVICE_NAME: &str = "EnvSensor";

/// Size of every notification payload: one IEEE-754 single-precision float.
pub const PAYLOAD_LEN: usize = 4;

// ── Timing ────────────────────────────────────────────────────────────────────

/// How long a discovery scan listens for advertisements.
pub const SCAN_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on `connect()` before the attempt is abandoned.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Cooperative wait between events while connected.
pub const IDLE_INTERVAL: Duration = Duration::from_millis(100);

// ── Buffers and display ───────────────────────────────────────────────────────

/// Number of readings retained per channel.
pub const SERIES_CAPACITY: usize = 100;

/// Fixed x-axis window of both charts (sample index).
pub const X_BOUNDS: [f64; 2] = [0.0, SERIES_CAPACITY as f64];

/// Temperature chart y-axis bounds in °C.
pub const TEMPERATURE_BOUNDS: [f64; 2] = [-10.0, 40.0];

/// Humidity chart y-axis bounds in %RH.
pub const HUMIDITY_BOUNDS: [f64; 2] = [0.0, 100.0];

// ── Alert surface ─────────────────────────────────────────────────────────────

/// Title of the fungal-risk modal.
pub const ALERT_TITLE: &str = "¡Alerta!";

/// Advisory text shown in the fungal-risk modal.
pub const ALERT_MESSAGE: &str =
    "El cultivo está en riesgo de contraer el hongo. Se recomienda aplicar tratamiento.";
