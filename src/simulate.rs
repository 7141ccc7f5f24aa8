use std::collections::VecDeque;
use std::f64::consts::PI;
use std::time::Duration;

use log::info;
use uuid::Uuid;

use crate::error::SensorError;
use crate::parse::encode_value;
use crate::protocol::{DEVICE_NAME, HUMIDITY_CHARACTERISTIC, TEMPERATURE_CHARACTERISTIC};
use crate::transport::{Link, Transport};
use crate::types::{DiscoveredDevice, Notification};

/// Time between simulated sensor updates.
const SAMPLE_INTERVAL: Duration = Duration::from_millis(500);

/// Generate the simulated temperature and humidity at time `t` (seconds).
///
/// | Channel | Centre | Swing | Period |
/// |---|---|---|---|
/// | Temperature | 16 °C | ±6 °C | 60 s |
/// | Humidity | 89 % | ±7 % | 45 s |
///
/// The two periods beat against each other, so the pair drifts in and out of
/// the fungal-risk zone every minute or so.  A small deterministic noise term
/// keeps the charts from looking synthetic.
pub fn sim_sample(t: f64) -> (f32, f32) {
    let noise = ((t * 1000.7).sin() * 9973.1).fract() - 0.5;
    let temp = 16.0 + 6.0 * (2.0 * PI * t / 60.0).sin() + 0.2 * noise;
    let hum = 89.0 + 7.0 * (2.0 * PI * t / 45.0 + 0.8).sin() + 0.5 * noise;
    (temp as f32, hum.clamp(0.0, 100.0) as f32)
}

/// A [`Transport`] that pretends an EnvSensor is in range.
///
/// Payloads are encoded exactly as the firmware would send them, so the
/// decoder and the rest of the pipeline run unchanged.
#[derive(Debug, Default)]
pub struct SimulatedTransport;

impl SimulatedTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for SimulatedTransport {
    type Link = SimulatedLink;

    async fn discover(&mut self, _window: Duration) -> Result<Vec<DiscoveredDevice>, SensorError> {
        tokio::time::sleep(Duration::from_millis(300)).await;
        Ok(vec![DiscoveredDevice {
            name: DEVICE_NAME.to_string(),
            address: "SIMULATED".to_string(),
        }])
    }

    async fn connect(
        &mut self,
        device: &DiscoveredDevice,
        _timeout: Duration,
    ) -> Result<SimulatedLink, SensorError> {
        info!("Simulator: connected to {}", device.name);
        Ok(SimulatedLink {
            ticker: tokio::time::interval(SAMPLE_INTERVAL),
            t: 0.0,
            subscribed: vec![],
            pending: VecDeque::new(),
            connected: true,
        })
    }
}

/// Link produced by [`SimulatedTransport`].
pub struct SimulatedLink {
    ticker: tokio::time::Interval,
    t: f64,
    subscribed: Vec<Uuid>,
    pending: VecDeque<Notification>,
    connected: bool,
}

impl Link for SimulatedLink {
    async fn subscribe(&mut self, characteristic: Uuid) -> Result<(), SensorError> {
        if characteristic != TEMPERATURE_CHARACTERISTIC && characteristic != HUMIDITY_CHARACTERISTIC {
            return Err(SensorError::CharacteristicNotFound(characteristic));
        }
        self.subscribed.push(characteristic);
        Ok(())
    }

    async fn unsubscribe(&mut self, characteristic: Uuid) -> Result<(), SensorError> {
        self.subscribed.retain(|&c| c != characteristic);
        Ok(())
    }

    async fn next_notification(&mut self) -> Option<Notification> {
        loop {
            if !self.connected {
                return None;
            }
            if let Some(n) = self.pending.pop_front() {
                return Some(n);
            }
            // `Interval::tick` is cancel-safe, and `pending` is only filled
            // after it completes, so a cancelled wait loses nothing.
            self.ticker.tick().await;
            let (temp, hum) = sim_sample(self.t);
            self.t += SAMPLE_INTERVAL.as_secs_f64();
            for (uuid, value) in [(TEMPERATURE_CHARACTERISTIC, temp), (HUMIDITY_CHARACTERISTIC, hum)] {
                if self.subscribed.contains(&uuid) {
                    self.pending.push_back(Notification {
                        characteristic: uuid,
                        value: encode_value(value).to_vec(),
                    });
                }
            }
        }
    }

    async fn is_connected(&mut self) -> bool {
        self.connected
    }

    async fn disconnect(&mut self) -> Result<(), SensorError> {
        self.connected = false;
        Ok(())
    }
}
