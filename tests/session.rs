//! End-to-end flows: scripted transport → session → monitor.

use envsensor_rs::ble_mock::MockTransport;
use envsensor_rs::error::SensorError;
use envsensor_rs::monitor::Monitor;
use envsensor_rs::protocol::{HUMIDITY_CHARACTERISTIC, TEMPERATURE_CHARACTERISTIC};
use envsensor_rs::session::{spawn_session, LoopExit, Session, SessionConfig};
use envsensor_rs::types::{Channel, SensorEvent, SessionState};
use tokio::sync::{mpsc, oneshot};

fn drain(rx: &mut mpsc::UnboundedReceiver<SensorEvent>) -> Vec<SensorEvent> {
    let mut out = vec![];
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

#[tokio::test]
async fn readings_reach_the_monitor_and_raise_the_alert() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut transport = MockTransport::with_sensor();
    transport
        .push_value(TEMPERATURE_CHARACTERISTIC, 15.0)
        .push_value(HUMIDITY_CHARACTERISTIC, 95.0);
    let mut session = Session::new(transport, SessionConfig::default(), tx);

    let mut link = session.start().await.unwrap();
    let (_stop_tx, mut stop_rx) = oneshot::channel();
    assert_eq!(session.run(&mut link, &mut stop_rx).await, LoopExit::LinkClosed);

    let mut monitor = Monitor::default();
    let mut events = drain(&mut rx).into_iter();

    // Scanning, Connected, temperature.
    for ev in events.by_ref().take(3) {
        assert_eq!(monitor.apply(ev), None);
    }
    assert_eq!(monitor.status(), &SessionState::Connected);
    assert_eq!(monitor.series(Channel::Temperature).iter().collect::<Vec<_>>(), vec![15.0]);
    assert_eq!(monitor.current(Channel::Temperature), 15.0);
    assert!(monitor.series(Channel::Humidity).is_empty());

    let alert = monitor.apply(events.next().unwrap()).expect("15 °C / 95 % is at risk");
    assert_eq!(alert.temperature, 15.0);
    assert_eq!(alert.humidity, 95.0);
    assert_eq!(monitor.series(Channel::Humidity).iter().collect::<Vec<_>>(), vec![95.0]);
    assert_eq!(monitor.label(Channel::Humidity), "Humidity: 95.0 %");
    assert_eq!(monitor.alerts_raised(), 1);
    assert!(events.next().is_none());

    session.stop(link).await;
}

#[tokio::test]
async fn missing_sensor_ends_in_error() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut transport = MockTransport::with_sensor();
    transport.devices.retain(|d| d.name != "EnvSensor");
    let log = transport.log.clone();
    let mut session = Session::new(transport, SessionConfig::default(), tx);

    let (_stop_tx, stop_rx) = oneshot::channel();
    assert_eq!(session.run_once(stop_rx).await, Err(SensorError::DeviceNotFound));

    let mut monitor = Monitor::default();
    for ev in drain(&mut rx) {
        monitor.apply(ev);
    }
    assert_eq!(monitor.status(), &SessionState::Error("device not found".into()));
    assert_eq!(monitor.status().to_string(), "Error: device not found");
    assert!(monitor.status().can_start());
    assert_eq!(log.lock().unwrap().connected_to, None);
}

#[tokio::test]
async fn stop_unsubscribes_then_disconnects() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut transport = MockTransport::with_sensor();
    transport.hold_open = true;
    let log = transport.log.clone();
    let mut session = Session::new(transport, SessionConfig::default(), tx);

    let (stop_tx, stop_rx) = oneshot::channel();
    stop_tx.send(()).unwrap();
    assert_eq!(session.run_once(stop_rx).await, Ok(LoopExit::Stopped));

    let log = log.lock().unwrap().clone();
    assert_eq!(
        log.unsubscribed,
        vec![TEMPERATURE_CHARACTERISTIC, HUMIDITY_CHARACTERISTIC]
    );
    assert!(log.disconnected);
    assert_eq!(session.state(), &SessionState::Disconnected);
    assert_eq!(
        drain(&mut rx).last(),
        Some(&SensorEvent::State(SessionState::Disconnected))
    );
}

#[tokio::test(start_paused = true)]
async fn lost_link_is_detected_on_idle_tick() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut transport = MockTransport::with_sensor();
    transport.hold_open = true;
    let remote = transport.clone();
    let log = transport.log.clone();
    let mut session = Session::new(transport, SessionConfig::default(), tx);

    // Out of range after a couple of idle ticks with no notifications.
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(250)).await;
        remote.drop_link();
    });

    let (_stop_tx, stop_rx) = oneshot::channel();
    assert_eq!(session.run_once(stop_rx).await, Ok(LoopExit::LinkClosed));

    let log = log.lock().unwrap().clone();
    assert_eq!(
        log.unsubscribed,
        vec![TEMPERATURE_CHARACTERISTIC, HUMIDITY_CHARACTERISTIC]
    );
    assert!(log.disconnected);
    assert_eq!(session.state(), &SessionState::Disconnected);
    assert_eq!(
        drain(&mut rx).last(),
        Some(&SensorEvent::State(SessionState::Disconnected))
    );
}

#[tokio::test]
async fn connect_timeout_is_reported() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut transport = MockTransport::with_sensor();
    transport.connect_error = Some(SensorError::Timeout(SessionConfig::default().connect_timeout));
    let mut session = Session::new(transport, SessionConfig::default(), tx);

    let err = session.start().await.unwrap_err();
    assert!(matches!(err, SensorError::Timeout(_)));
    assert_eq!(
        session.state(),
        &SessionState::Error("connection timed out after 30s".into())
    );
}

#[tokio::test]
async fn failed_subscribe_closes_the_link() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut transport = MockTransport::with_sensor();
    transport.fail_subscribe = Some(HUMIDITY_CHARACTERISTIC);
    let log = transport.log.clone();
    let mut session = Session::new(transport, SessionConfig::default(), tx);

    assert_eq!(
        session.start().await.err(),
        Some(SensorError::CharacteristicNotFound(HUMIDITY_CHARACTERISTIC))
    );
    let log = log.lock().unwrap().clone();
    assert_eq!(log.subscribed, vec![TEMPERATURE_CHARACTERISTIC]);
    assert!(log.disconnected);
    assert!(matches!(session.state(), SessionState::Error(_)));
}

#[tokio::test]
async fn session_can_restart_after_error() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut transport = MockTransport::with_sensor();
    transport.connect_error = Some(SensorError::Connection("le-connection-abort-by-local".into()));
    let mut session = Session::new(transport, SessionConfig::default(), tx);

    assert!(session.start().await.is_err());
    // A second attempt is accepted from Error and fails the same way.
    assert!(matches!(
        session.start().await,
        Err(SensorError::Connection(_))
    ));
}

#[test]
fn spawned_session_streams_events_to_the_ui_thread() {
    let mut transport = MockTransport::with_sensor();
    transport
        .push_value(TEMPERATURE_CHARACTERISTIC, 21.5)
        .push_value(HUMIDITY_CHARACTERISTIC, 40.0)
        .push_value(TEMPERATURE_CHARACTERISTIC, 22.0);
    let log = transport.log.clone();

    let (mut rx, handle) = spawn_session(transport, SessionConfig::default()).unwrap();
    let mut monitor = Monitor::default();
    while let Some(ev) = rx.blocking_recv() {
        assert_eq!(monitor.apply(ev), None);
    }
    handle.stop();

    assert_eq!(monitor.status(), &SessionState::Disconnected);
    assert_eq!(monitor.series(Channel::Temperature).len(), 2);
    assert_eq!(monitor.series(Channel::Humidity).len(), 1);
    assert_eq!(monitor.label(Channel::Temperature), "Temperature: 22.0 °C");
    assert!(log.lock().unwrap().disconnected);
}
