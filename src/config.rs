use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::alert::{AlertMode, AlertRule};
use crate::protocol::{DEVICE_NAME, SERIES_CAPACITY};
use crate::session::SessionConfig;

/// User-tunable settings, loaded from an optional JSON file.
///
/// Every field has a default, so a partial file such as
/// `{ "alert_mode": "on_rising_edge" }` is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Exact advertised name of the sensor.  Default: `"EnvSensor"`.
    pub device_name: String,
    /// Discovery window in seconds.  Default: `5`.
    pub scan_timeout_secs: u64,
    /// Connect timeout in seconds.  Default: `30`.
    pub connect_timeout_secs: u64,
    /// Idle wait between events while connected, in milliseconds.  Default: `100`.
    pub idle_interval_ms: u64,
    /// Readings kept per chart.  Default: `100`.
    pub series_capacity: usize,
    pub alert: AlertRule,
    pub alert_mode: AlertMode,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            device_name: DEVICE_NAME.into(),
            scan_timeout_secs: 5,
            connect_timeout_secs: 30,
            idle_interval_ms: 100,
            series_capacity: SERIES_CAPACITY,
            alert: AlertRule::default(),
            alert_mode: AlertMode::default(),
        }
    }
}

impl AppConfig {
    /// Read `path`.  A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_json(&text)
                .with_context(|| format!("invalid config file {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e).with_context(|| format!("cannot read {}", path.display())),
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load the file named by `--config <path>` in `args`, or the defaults.
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            if arg == "--config" {
                let path = args.next().context("--config needs a path")?;
                return Self::load(path);
            }
        }
        Ok(Self::default())
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            device_name: self.device_name.clone(),
            scan_timeout: Duration::from_secs(self.scan_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            idle_interval: Duration::from_millis(self.idle_interval_ms),
        }
    }
}
