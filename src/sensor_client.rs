use std::collections::{BTreeSet, HashMap};
use std::pin::Pin;
use std::time::Duration;

use btleplug::api::{Central, Characteristic, Manager as _, Peripheral as _, ScanFilter, ValueNotification};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::{Stream, StreamExt};
use log::{debug, info, warn};
use uuid::Uuid;

use crate::error::SensorError;
use crate::transport::{Link, Transport};
use crate::types::{DiscoveredDevice, Notification};

type NotificationStream = Pin<Box<dyn Stream<Item = ValueNotification> + Send>>;

// ── SensorClient ──────────────────────────────────────────────────────────────

/// `btleplug`-backed [`Transport`] for the EnvSensor.
///
/// The first Bluetooth adapter is opened lazily on the first
/// [`discover`](Transport::discover).  Peripherals seen during the most recent
/// scan are remembered so [`connect`](Transport::connect) can resolve a
/// [`DiscoveredDevice`] back to its platform handle.
#[derive(Default)]
pub struct SensorClient {
    adapter: Option<Adapter>,
    seen: HashMap<String, Peripheral>,
}

impl SensorClient {
    pub fn new() -> Self {
        Self::default()
    }

    async fn adapter(&mut self) -> Result<Adapter, SensorError> {
        if let Some(adapter) = &self.adapter {
            return Ok(adapter.clone());
        }
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(SensorError::NoAdapter)?;

        // ── macOS: wait for the CoreBluetooth manager to reach poweredOn ─────
        // Scanning before CBCentralManager is ready is a silent no-op.
        #[cfg(target_os = "macos")]
        {
            use btleplug::api::CentralState;

            let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
            loop {
                match adapter.adapter_state().await {
                    Ok(CentralState::PoweredOn) => break,
                    Ok(state) if tokio::time::Instant::now() >= deadline => {
                        warn!("macOS: adapter still in state {state:?} after 3 s, proceeding anyway");
                        break;
                    }
                    Ok(state) => debug!("macOS: adapter state = {state:?}, waiting…"),
                    Err(e) => {
                        warn!("macOS: adapter_state() error: {e}");
                        break;
                    }
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        }

        self.adapter = Some(adapter.clone());
        Ok(adapter)
    }
}

impl Transport for SensorClient {
    type Link = SensorLink;

    async fn discover(&mut self, window: Duration) -> Result<Vec<DiscoveredDevice>, SensorError> {
        let adapter = self.adapter().await?;

        info!("Scanning for {window:?} …");
        adapter.start_scan(ScanFilter::default()).await?;
        tokio::time::sleep(window).await;
        adapter.stop_scan().await.ok();

        self.seen.clear();
        let mut found = vec![];
        for p in adapter.peripherals().await? {
            if let Ok(Some(props)) = p.properties().await {
                if let Some(name) = props.local_name {
                    let address = p.id().to_string();
                    debug!("discover: {name}  id={address}");
                    found.push(DiscoveredDevice { name, address: address.clone() });
                    self.seen.insert(address, p);
                }
            }
        }
        info!("discover: {} named device(s) found", found.len());
        Ok(found)
    }

    async fn connect(
        &mut self,
        device: &DiscoveredDevice,
        timeout: Duration,
    ) -> Result<SensorLink, SensorError> {
        let peripheral = self
            .seen
            .get(&device.address)
            .cloned()
            .ok_or_else(|| SensorError::Connection(format!("{} is no longer known", device.address)))?;

        // BlueZ's Device1.Connect can block forever when the device is out of
        // range, so the timeout is enforced here rather than trusted to the stack.
        match tokio::time::timeout(timeout, peripheral.connect()).await {
            Ok(result) => result?,
            Err(_) => {
                // A pending Connect can still complete after we give up.
                peripheral.disconnect().await.ok();
                return Err(SensorError::Timeout(timeout));
            }
        }

        // On Linux the link reports connected before the GATT cache is
        // populated; discovering too early returns an empty set.
        #[cfg(target_os = "linux")]
        tokio::time::sleep(Duration::from_millis(600)).await;

        if let Err(e) = discover_services(&peripheral, timeout).await {
            peripheral.disconnect().await.ok();
            return Err(e);
        }
        info!("Connected and services discovered: {}", device.name);

        let notifications = match peripheral.notifications().await {
            Ok(n) => n,
            Err(e) => {
                peripheral.disconnect().await.ok();
                return Err(e.into());
            }
        };

        Ok(SensorLink {
            characteristics: peripheral.characteristics(),
            peripheral,
            notifications,
        })
    }
}

async fn discover_services(peripheral: &Peripheral, timeout: Duration) -> Result<(), SensorError> {
    tokio::time::timeout(timeout, peripheral.discover_services())
        .await
        .map_err(|_| SensorError::Timeout(timeout))??;
    Ok(())
}

// ── SensorLink ────────────────────────────────────────────────────────────────

/// A live `btleplug` connection to an EnvSensor.
pub struct SensorLink {
    peripheral: Peripheral,
    characteristics: BTreeSet<Characteristic>,
    notifications: NotificationStream,
}

impl SensorLink {
    fn find_char(&self, uuid: Uuid) -> Result<&Characteristic, SensorError> {
        self.characteristics
            .iter()
            .find(|c| c.uuid == uuid)
            .ok_or(SensorError::CharacteristicNotFound(uuid))
    }
}

impl Link for SensorLink {
    async fn subscribe(&mut self, characteristic: Uuid) -> Result<(), SensorError> {
        let c = self.find_char(characteristic)?.clone();
        self.peripheral.subscribe(&c).await?;
        debug!("Subscribed to {characteristic}");
        Ok(())
    }

    async fn unsubscribe(&mut self, characteristic: Uuid) -> Result<(), SensorError> {
        let c = self.find_char(characteristic)?.clone();
        self.peripheral.unsubscribe(&c).await?;
        debug!("Unsubscribed from {characteristic}");
        Ok(())
    }

    async fn next_notification(&mut self) -> Option<Notification> {
        self.notifications.next().await.map(|n| Notification {
            characteristic: n.uuid,
            value: n.value,
        })
    }

    async fn is_connected(&mut self) -> bool {
        self.peripheral.is_connected().await.unwrap_or(false)
    }

    async fn disconnect(&mut self) -> Result<(), SensorError> {
        self.peripheral.disconnect().await?;
        Ok(())
    }
}
