//! Connection session: discover the EnvSensor, connect, subscribe, forward
//! decoded readings, tear down.
//!
//! A [`Session`] is driven by a single async task.  [`spawn_session`] gives
//! that task its own OS thread and current-thread tokio runtime, so the UI
//! thread only ever sees [`SensorEvent`]s arriving on a channel.

use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::{mpsc, oneshot};

use crate::error::SensorError;
use crate::parse::decode_notification;
use crate::protocol::{CONNECT_TIMEOUT, DEVICE_NAME, IDLE_INTERVAL, SCAN_TIMEOUT, SENSOR_CHARACTERISTICS};
use crate::transport::{Link, Transport};
use crate::types::{Notification, SensorEvent, SessionState};

// ── SessionConfig ─────────────────────────────────────────────────────────────

/// Timing and device selection for a [`Session`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Exact advertised name of the peripheral to connect to.
    pub device_name: String,
    /// Discovery window.
    pub scan_timeout: Duration,
    /// Upper bound on connect (and on GATT service discovery).
    pub connect_timeout: Duration,
    /// Cooperative wait between events while connected; the link's liveness
    /// is checked whenever a full interval passes without a notification.
    pub idle_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            device_name: DEVICE_NAME.into(),
            scan_timeout: SCAN_TIMEOUT,
            connect_timeout: CONNECT_TIMEOUT,
            idle_interval: IDLE_INTERVAL,
        }
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

/// Why the connected loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// A stop was requested (or the stop sender was dropped).
    Stopped,
    /// The transport closed the link.
    LinkClosed,
}

pub struct Session<T: Transport> {
    transport: T,
    config: SessionConfig,
    state: SessionState,
    events: mpsc::UnboundedSender<SensorEvent>,
}

impl<T: Transport> Session<T> {
    pub fn new(
        transport: T,
        config: SessionConfig,
        events: mpsc::UnboundedSender<SensorEvent>,
    ) -> Self {
        Self {
            transport,
            config,
            state: SessionState::Disconnected,
            events,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    fn set_state(&mut self, state: SessionState) {
        info!("Session: {} → {}", self.state, state);
        self.state = state.clone();
        // The receiver going away only means nobody is watching any more.
        let _ = self.events.send(SensorEvent::State(state));
    }

    /// Discover, connect, and subscribe.
    ///
    /// Valid only from `Disconnected` or `Error`.  On success the session is
    /// `Connected` and the returned link is subscribed to both channels.
    /// On failure the session is `Error(reason)` and no link remains open.
    pub async fn start(&mut self) -> Result<T::Link, SensorError> {
        if !self.state.can_start() {
            return Err(SensorError::InvalidState(self.state.clone()));
        }
        self.set_state(SessionState::Scanning);

        match self.connect_and_subscribe().await {
            Ok(link) => {
                self.set_state(SessionState::Connected);
                Ok(link)
            }
            Err(e) => {
                error!("Session failed: {e}");
                self.set_state(SessionState::Error(e.to_string()));
                Err(e)
            }
        }
    }

    async fn connect_and_subscribe(&mut self) -> Result<T::Link, SensorError> {
        let devices = self.transport.discover(self.config.scan_timeout).await?;
        let device = devices
            .into_iter()
            .find(|d| d.name == self.config.device_name)
            .ok_or(SensorError::DeviceNotFound)?;
        info!("Found {} at {}", device.name, device.address);

        let mut link = self
            .transport
            .connect(&device, self.config.connect_timeout)
            .await?;

        for &characteristic in &SENSOR_CHARACTERISTICS {
            if let Err(e) = link.subscribe(characteristic).await {
                if let Err(de) = link.disconnect().await {
                    warn!("Disconnect after failed subscribe: {de}");
                }
                return Err(e);
            }
        }
        Ok(link)
    }

    /// Forward notifications until a stop is requested or the link closes.
    pub async fn run(&mut self, link: &mut T::Link, stop: &mut oneshot::Receiver<()>) -> LoopExit {
        loop {
            tokio::select! {
                biased;

                _ = &mut *stop => {
                    info!("Stop requested.");
                    return LoopExit::Stopped;
                }
                notif = link.next_notification() => match notif {
                    Some(n) => self.dispatch(&n),
                    None => {
                        info!("Notification stream ended – device disconnected.");
                        return LoopExit::LinkClosed;
                    }
                },
                _ = tokio::time::sleep(self.config.idle_interval) => {
                    if !link.is_connected().await {
                        warn!("Link reported disconnected while idle.");
                        return LoopExit::LinkClosed;
                    }
                }
            }
        }
    }

    fn dispatch(&self, notif: &Notification) {
        debug!("Notification from {}: {:02x?}", notif.characteristic, notif.value);
        match decode_notification(notif) {
            Ok(reading) => {
                let _ = self.events.send(SensorEvent::Reading(reading));
            }
            Err(e) => warn!("Dropping notification from {}: {e}", notif.characteristic),
        }
    }

    /// Unsubscribe both channels, disconnect, and return to `Disconnected`.
    ///
    /// Teardown failures are logged; the link is considered gone either way.
    pub async fn stop(&mut self, mut link: T::Link) {
        for &characteristic in &SENSOR_CHARACTERISTICS {
            if let Err(e) = link.unsubscribe(characteristic).await {
                warn!("Unsubscribe {characteristic}: {e}");
            }
        }
        if let Err(e) = link.disconnect().await {
            warn!("Disconnect: {e}");
        }
        self.set_state(SessionState::Disconnected);
    }

    /// One full attempt: [`start`](Self::start), [`run`](Self::run), [`stop`](Self::stop).
    pub async fn run_once(&mut self, mut stop: oneshot::Receiver<()>) -> Result<LoopExit, SensorError> {
        let mut link = self.start().await?;
        let exit = self.run(&mut link, &mut stop).await;
        self.stop(link).await;
        Ok(exit)
    }
}

// ── Worker thread ─────────────────────────────────────────────────────────────

/// Run one session attempt on a dedicated background thread.
///
/// Returns the event receiver for the UI thread and a [`SessionHandle`] that
/// stops the session.
pub fn spawn_session<T>(
    transport: T,
    config: SessionConfig,
) -> std::io::Result<(mpsc::UnboundedReceiver<SensorEvent>, SessionHandle)>
where
    T: Transport + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let (stop_tx, stop_rx) = oneshot::channel();

    let worker = std::thread::Builder::new()
        .name("envsensor-session".into())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    error!("Could not build session runtime: {e}");
                    let _ = tx.send(SensorEvent::State(SessionState::Error(format!(
                        "runtime: {e}"
                    ))));
                    return;
                }
            };
            let mut session = Session::new(transport, config, tx);
            match rt.block_on(session.run_once(stop_rx)) {
                Ok(exit) => debug!("Session ended: {exit:?}"),
                Err(e) => debug!("Session attempt failed: {e}"),
            }
        })?;

    Ok((
        rx,
        SessionHandle {
            stop: Some(stop_tx),
            worker: Some(worker),
        },
    ))
}

/// Controls a session running on its worker thread.
///
/// Dropping the handle stops the session and waits for teardown.
pub struct SessionHandle {
    stop: Option<oneshot::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// Ask the session to stop without waiting.  A connected session
    /// unsubscribes and disconnects; a session still scanning or connecting
    /// finishes that step first.
    pub fn request_stop(&mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
    }

    /// `true` once the worker thread has exited.
    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().map_or(true, |w| w.is_finished())
    }

    /// Stop the session and block until it has disconnected.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.request_stop();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Session worker panicked");
            }
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble_mock::MockTransport;
    use crate::protocol::{HUMIDITY_CHARACTERISTIC, TEMPERATURE_CHARACTERISTIC};
    use crate::types::{Channel, Reading};

    fn drain(rx: &mut mpsc::UnboundedReceiver<SensorEvent>) -> Vec<SensorEvent> {
        let mut out = vec![];
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut transport = MockTransport::with_sensor();
        transport.hold_open = true;
        let mut session = Session::new(transport, SessionConfig::default(), tx);

        let _link = session.start().await.unwrap();
        assert_eq!(session.state(), &SessionState::Connected);
        assert_eq!(
            session.start().await.err(),
            Some(SensorError::InvalidState(SessionState::Connected))
        );
    }

    #[tokio::test]
    async fn subscribes_to_both_channels_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let transport = MockTransport::with_sensor();
        let log = transport.log.clone();
        let mut session = Session::new(transport, SessionConfig::default(), tx);

        let _link = session.start().await.unwrap();
        let log = log.lock().unwrap().clone();
        assert_eq!(log.connected_to.as_deref(), Some("AA:BB:CC:00:00:02"));
        assert_eq!(
            log.subscribed,
            vec![TEMPERATURE_CHARACTERISTIC, HUMIDITY_CHARACTERISTIC]
        );
        assert_eq!(
            drain(&mut rx),
            vec![
                SensorEvent::State(SessionState::Scanning),
                SensorEvent::State(SessionState::Connected),
            ]
        );
    }

    #[tokio::test]
    async fn device_name_must_match_exactly() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut transport = MockTransport::with_sensor();
        for d in &mut transport.devices {
            d.name = d.name.to_lowercase();
        }
        let log = transport.log.clone();
        let mut session = Session::new(transport, SessionConfig::default(), tx);

        assert_eq!(session.start().await.err(), Some(SensorError::DeviceNotFound));
        assert_eq!(log.lock().unwrap().connected_to, None);
    }

    #[tokio::test]
    async fn malformed_payloads_are_dropped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut transport = MockTransport::with_sensor();
        transport
            .push_raw(TEMPERATURE_CHARACTERISTIC, vec![0x01, 0x02, 0x03])
            .push_raw(HUMIDITY_CHARACTERISTIC, f32::NAN.to_le_bytes().to_vec())
            .push_value(HUMIDITY_CHARACTERISTIC, 70.0);
        let mut session = Session::new(transport, SessionConfig::default(), tx);

        let (_stop_tx, stop_rx) = oneshot::channel();
        let exit = session.run_once(stop_rx).await.unwrap();
        assert_eq!(exit, LoopExit::LinkClosed);

        let readings: Vec<Reading> = drain(&mut rx)
            .into_iter()
            .filter_map(|ev| match ev {
                SensorEvent::Reading(r) => Some(r),
                _ => None,
            })
            .collect();
        assert_eq!(
            readings,
            vec![Reading { channel: Channel::Humidity, value: 70.0 }]
        );
        assert_eq!(session.state(), &SessionState::Disconnected);
    }
}
