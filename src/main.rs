use std::io::{self, BufRead};

use anyhow::Result;
use log::{error, info};

use envsensor_rs::config::AppConfig;
use envsensor_rs::monitor::Monitor;
use envsensor_rs::sensor_client::SensorClient;
use envsensor_rs::session::spawn_session;
use envsensor_rs::simulate::SimulatedTransport;
use envsensor_rs::types::{Channel, SensorEvent, SessionState};

#[tokio::main]
async fn main() -> Result<()> {
    // ── Logging ───────────────────────────────────────────────────────────────
    // Set RUST_LOG=debug for raw notification dumps, e.g.:
    //   RUST_LOG=envsensor_rs=debug cargo run
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // ── Configuration ─────────────────────────────────────────────────────────
    let config = AppConfig::from_args(std::env::args())?;
    let simulate = std::env::args().any(|a| a == "--simulate");

    let mut monitor = Monitor::with_capacity(config.series_capacity, config.alert, config.alert_mode);

    // ── Connect ───────────────────────────────────────────────────────────────
    info!("Connecting to {} …", config.device_name);
    let (mut rx, mut handle) = if simulate {
        spawn_session(SimulatedTransport::new(), config.session_config())?
    } else {
        spawn_session(SensorClient::new(), config.session_config())?
    };
    info!("Type 'q' + Enter to disconnect and quit, 'r' + Enter to reset.");

    // ── Stdin command loop ────────────────────────────────────────────────────
    // Lines are read on a plain OS thread so the StdinLock never crosses an
    // await point.
    let (line_tx, mut line_rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(l) => {
                    if line_tx.send(l.trim().to_owned()).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });

    // ── Main event loop ───────────────────────────────────────────────────────
    let mut stdin_open = true;
    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else {
                    info!("Session worker exited.");
                    break;
                };
                let is_reading = matches!(event, SensorEvent::Reading(_));
                let alert = monitor.apply(event);

                if is_reading {
                    println!(
                        "[DATA] {}   {}",
                        monitor.label(Channel::Temperature),
                        monitor.label(Channel::Humidity)
                    );
                }
                if let Some(a) = alert {
                    println!("[ALERT] {} {}  ({:.1} °C, {:.1} %)", a.title(), a.message(), a.temperature, a.humidity);
                    monitor.dismiss_alert();
                }
                match monitor.status() {
                    SessionState::Error(reason) => {
                        error!("Session failed: {reason}");
                        break;
                    }
                    SessionState::Disconnected => {
                        info!("❌  Disconnected.");
                        break;
                    }
                    SessionState::Connected if !is_reading => info!("✅  Connected to {}", config.device_name),
                    _ => {}
                }
            }
            line = line_rx.recv(), if stdin_open => match line.as_deref() {
                Some("q") => {
                    info!("Quit requested.");
                    handle.request_stop();
                }
                Some("r") => {
                    monitor.reset();
                    info!("Readings reset.");
                }
                Some("") => {}
                None => stdin_open = false,
                Some(other) => info!("Unknown command: '{other}'"),
            },
        }
    }

    // Joining waits for unsubscribe + disconnect on the worker.
    tokio::task::spawn_blocking(move || handle.stop()).await?;
    info!("Event loop finished – exiting.");
    Ok(())
}
