//! # envsensor-rs
//!
//! Live temperature / humidity monitor for the **EnvSensor** BLE peripheral,
//! with a fungal-risk alert for greenhouse crops.
//!
//! The sensor notifies two standard characteristics, each carrying one
//! little-endian `f32`:
//!
//! | Channel | Characteristic | Unit |
//! |---|---|---|
//! | Temperature | `0x2A6E` | °C |
//! | Humidity | `0x2A6F` | %RH |
//!
//! The alert fires when `12 ≤ temperature ≤ 18` and `humidity > 92`.
//!
//! ## Quick start
//!
//! ```no_run
//! use envsensor_rs::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let (mut rx, handle) = spawn_session(SensorClient::new(), SessionConfig::default())?;
//!     let mut monitor = Monitor::default();
//!
//!     while let Some(event) = rx.blocking_recv() {
//!         if let Some(alert) = monitor.apply(event) {
//!             println!("{}: {}", alert.title(), alert.message());
//!         }
//!         if matches!(monitor.status(), SessionState::Disconnected | SessionState::Error(_)) {
//!             break;
//!         }
//!     }
//!     handle.stop();
//!     Ok(())
//! }
//! ```
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |---|---|
//! | [`prelude`] | One-line glob import of the commonly needed types |
//! | [`session`] | Discover / connect / subscribe state machine and its worker thread |
//! | [`monitor`] | UI-side state: both series, current values, status, pending alert |
//! | [`series`] | Bounded FIFO buffer of readings |
//! | [`alert`] | Fungal-risk rule |
//! | [`parse`] | 4-byte payload decoder |
//! | [`transport`] | Traits the session drives; implemented by [`sensor_client`], [`simulate`], [`ble_mock`] |
//! | [`protocol`] | GATT UUIDs and fixed constants |
//! | [`config`] | JSON configuration |

pub mod alert;
pub mod ble_mock;
pub mod config;
pub mod error;
pub mod monitor;
pub mod parse;
pub mod protocol;
pub mod sensor_client;
pub mod series;
pub mod session;
pub mod simulate;
pub mod transport;
pub mod types;

// ── Prelude ───────────────────────────────────────────────────────────────────

/// Convenience re-exports for downstream crates.
pub mod prelude {
    // ── Session and transports ────────────────────────────────────────────────
    pub use crate::sensor_client::SensorClient;
    pub use crate::session::{spawn_session, Session, SessionConfig, SessionHandle};
    pub use crate::simulate::SimulatedTransport;
    pub use crate::transport::{Link, Transport};

    // ── State and data types ──────────────────────────────────────────────────
    pub use crate::alert::{evaluate, Alert, AlertMode, AlertRule};
    pub use crate::config::AppConfig;
    pub use crate::error::{DecodeError, SensorError};
    pub use crate::monitor::Monitor;
    pub use crate::series::Series;
    pub use crate::types::{Channel, Reading, SensorEvent, SessionState};

    // ── Protocol constants ────────────────────────────────────────────────────
    pub use crate::protocol::{
        DEVICE_NAME, HUMIDITY_CHARACTERISTIC, SERIES_CAPACITY, TEMPERATURE_CHARACTERISTIC,
    };
}
