//! Real-time temperature / humidity chart viewer for the EnvSensor.
//!
//! Usage:
//!   cargo run --bin tui                          # real sensor over BLE
//!   cargo run --bin tui -- --simulate            # built-in simulator (no hardware needed)
//!   cargo run --bin tui -- --config my.json      # override thresholds, timeouts, …
//!
//! Keys
//! ----
//!   c        connect (scan for the EnvSensor)
//!   d        disconnect
//!   r        reset both charts and the current values
//!   q / Esc  quit
//!
//! Keys (alert popup)
//! ------------------
//!   Enter / Esc   close

use std::io;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Margin, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Clear, Dataset, GraphType, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc::{error::TryRecvError, UnboundedReceiver};

use envsensor_rs::alert::Alert;
use envsensor_rs::config::AppConfig;
use envsensor_rs::monitor::Monitor;
use envsensor_rs::protocol::{HUMIDITY_BOUNDS, TEMPERATURE_BOUNDS, X_BOUNDS};
use envsensor_rs::sensor_client::SensorClient;
use envsensor_rs::session::{spawn_session, SessionHandle};
use envsensor_rs::simulate::SimulatedTransport;
use envsensor_rs::types::{Channel, SensorEvent, SessionState};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Line colour per chart: temperature, humidity.
const COLORS: [Color; 2] = [Color::LightGreen, Color::Cyan];

/// Braille spinner frames cycled at ~100 ms intervals while scanning.
const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

// ── App ───────────────────────────────────────────────────────────────────────

/// UI-thread state.  The session worker only reaches it through `events`.
struct App {
    monitor: Monitor,
    config: AppConfig,
    simulate: bool,
    session: Option<SessionHandle>,
    events: Option<UnboundedReceiver<SensorEvent>>,
    /// Set when the worker could not even be spawned.
    last_error: Option<String>,
}

impl App {
    fn new(config: AppConfig, simulate: bool) -> Self {
        Self {
            monitor: Monitor::with_capacity(config.series_capacity, config.alert, config.alert_mode),
            config,
            simulate,
            session: None,
            events: None,
            last_error: None,
        }
    }

    /// Start a session on a background thread.
    ///
    /// Ignored while a session is scanning or connected, or while the previous
    /// worker is still tearing down.
    fn connect(&mut self) {
        if !self.monitor.status().can_start() {
            return;
        }
        if let Some(h) = &self.session {
            if !h.is_finished() {
                return;
            }
        }
        // Dropping a finished handle joins immediately.
        self.session = None;

        let spawned = if self.simulate {
            spawn_session(SimulatedTransport::new(), self.config.session_config())
        } else {
            spawn_session(SensorClient::new(), self.config.session_config())
        };
        match spawned {
            Ok((rx, handle)) => {
                self.events = Some(rx);
                self.session = Some(handle);
                self.last_error = None;
            }
            Err(e) => {
                log::error!("Could not start session thread: {e}");
                self.last_error = Some(e.to_string());
            }
        }
    }

    /// Ask the running session to unsubscribe and disconnect.  Non-blocking.
    fn disconnect(&mut self) {
        if let Some(h) = &mut self.session {
            h.request_stop();
        }
    }

    /// Apply every event the worker has posted since the last frame.
    fn drain_events(&mut self) {
        let Some(rx) = &mut self.events else {
            return;
        };
        loop {
            match rx.try_recv() {
                Ok(ev) => {
                    self.monitor.apply(ev);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.events = None;
                    break;
                }
            }
        }
    }
}

// ── Rendering ─────────────────────────────────────────────────────────────────

fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let root = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(3),
    ])
    .split(area);

    draw_header(frame, root[0], app);
    draw_charts(frame, root[1], &app.monitor);
    draw_values(frame, root[2], &app.monitor);
    draw_footer(frame, root[3], app);

    if let Some(alert) = app.monitor.pending_alert() {
        draw_alert(frame, area, alert);
    }
}

fn spinner_str() -> &'static str {
    let ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    SPINNER[(ms / 100) as usize % SPINNER.len()]
}

/// Status bar: title, session state, alert count.
///
/// Green = connected, yellow = scanning, red = error, grey = disconnected.
fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
    let (label, color) = match app.monitor.status() {
        SessionState::Scanning => (
            format!("{} Scanning for {}…", spinner_str(), app.config.device_name),
            Color::Yellow,
        ),
        SessionState::Connected if app.simulate => ("◆ Connected (simulated)".to_owned(), Color::Cyan),
        SessionState::Connected => (format!("● Connected to {}", app.config.device_name), Color::Green),
        SessionState::Error(reason) => (format!("✖ Error: {reason}"), Color::Red),
        SessionState::Disconnected => match &app.last_error {
            Some(e) => (format!("○ Disconnected ({e})"), Color::Red),
            None => ("○ Disconnected".to_owned(), Color::Gray),
        },
    };

    let alerts = format!("{} alert(s)", app.monitor.alerts_raised());

    let line = Line::from(vec![
        Span::styled(
            " EnvSensor Monitor ",
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        sep(),
        Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        sep(),
        Span::styled(
            alerts,
            Style::default().fg(if app.monitor.alerts_raised() > 0 {
                Color::LightRed
            } else {
                Color::DarkGray
            }),
        ),
        Span::raw(" "),
    ]);

    frame.render_widget(
        Paragraph::new(line).block(Block::default().borders(Borders::ALL)),
        area,
    );
}

#[inline]
fn sep<'a>() -> Span<'a> {
    Span::styled(" │ ", Style::default().fg(Color::DarkGray))
}

fn draw_charts(frame: &mut Frame, area: Rect, monitor: &Monitor) {
    let rows = Layout::vertical([Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)]).split(area);
    draw_channel(frame, rows[0], Channel::Temperature, TEMPERATURE_BOUNDS, COLORS[0], monitor);
    draw_channel(frame, rows[1], Channel::Humidity, HUMIDITY_BOUNDS, COLORS[1], monitor);
}

/// One fixed-window chart: x = sample index 0‥100, y = `bounds`.
fn draw_channel(
    frame: &mut Frame,
    area: Rect,
    channel: Channel,
    bounds: [f64; 2],
    color: Color,
    monitor: &Monitor,
) {
    let [lo, hi] = bounds;
    // Out-of-range readings are clipped by the axis bounds.
    let data = monitor.series(channel).snapshot();

    let title = format!(" {channel} ({}) ", channel.unit());
    let y_labels: Vec<String> = [0.0, 0.25, 0.5, 0.75, 1.0]
        .iter()
        .map(|&f| format!("{:.0}", lo + f * (hi - lo)))
        .collect();
    let x_labels = vec![
        format!("{:.0}", X_BOUNDS[0]),
        format!("{:.0}", (X_BOUNDS[0] + X_BOUNDS[1]) / 2.0),
        format!("{:.0}", X_BOUNDS[1]),
    ];

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(color))
        .data(&data);

    let chart = Chart::new(vec![dataset])
        .block(
            Block::default()
                .title(Span::styled(
                    title,
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color)),
        )
        .x_axis(
            Axis::default()
                .title("Time")
                .bounds(X_BOUNDS)
                .labels(x_labels)
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds(bounds)
                .labels(y_labels)
                .style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(chart, area);
}

fn draw_values(frame: &mut Frame, area: Rect, monitor: &Monitor) {
    let line = Line::from(vec![
        Span::raw(" "),
        Span::styled(
            monitor.label(Channel::Temperature),
            Style::default().fg(COLORS[0]).add_modifier(Modifier::BOLD),
        ),
        Span::raw("     "),
        Span::styled(
            monitor.label(Channel::Humidity),
            Style::default().fg(COLORS[1]).add_modifier(Modifier::BOLD),
        ),
    ]);
    frame.render_widget(
        Paragraph::new(line).block(Block::default().borders(Borders::ALL)),
        area,
    );
}

fn draw_footer(frame: &mut Frame, area: Rect, app: &App) {
    let keys = Line::from(vec![
        Span::raw(" "),
        key("[c]"),
        Span::raw("Connect  "),
        key("[d]"),
        Span::raw("Disconnect  "),
        key("[r]"),
        Span::raw("Reset  "),
        key("[q]"),
        Span::raw("Quit"),
    ]);

    let hint = match app.monitor.status() {
        SessionState::Error(_) if cfg!(target_os = "macos") => Line::from(Span::styled(
            " Make sure the sensor is powered on, and grant Bluetooth access: System Settings → Privacy & Security → Bluetooth.",
            Style::default().fg(Color::Yellow),
        )),
        SessionState::Error(_) => Line::from(Span::styled(
            " Make sure the sensor is powered on and in range, then press [c] to retry.",
            Style::default().fg(Color::Yellow),
        )),
        _ => Line::raw(""),
    };

    frame.render_widget(
        Paragraph::new(vec![keys, hint]).block(Block::default().borders(Borders::ALL)),
        area,
    );
}

#[inline]
fn key(s: &str) -> Span<'_> {
    Span::styled(
        s,
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )
}

/// Centered modal with the fixed alert title and advisory text.
fn draw_alert(frame: &mut Frame, area: Rect, alert: &Alert) {
    let box_w = 50.min(area.width);
    let box_h = 9.min(area.height);
    let x = area.x + (area.width.saturating_sub(box_w)) / 2;
    let y = area.y + (area.height.saturating_sub(box_h)) / 2;
    let popup = Rect::new(x, y, box_w, box_h);

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Block::default()
            .title(Span::styled(
                format!(" {} ", alert.title()),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red)),
        popup,
    );

    let inner = popup.inner(Margin {
        horizontal: 2,
        vertical: 1,
    });
    let [text_area, hint_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(inner);

    frame.render_widget(
        Paragraph::new(vec![
            Line::from(alert.message()),
            Line::raw(""),
            Line::from(Span::styled(
                format!("{:.1} °C   {:.1} %", alert.temperature, alert.humidity),
                Style::default().fg(Color::DarkGray),
            )),
        ])
        .wrap(Wrap { trim: true }),
        text_area,
    );
    frame.render_widget(
        Paragraph::new(Line::from(vec![key("[Enter]"), Span::raw(" Cerrar")])),
        hint_area,
    );
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    use std::io::IsTerminal as _;
    if !io::stdout().is_terminal() {
        eprintln!("Error: the envsensor tui requires a real terminal (TTY).");
        eprintln!("Run it directly in a terminal emulator, not piped or redirected.");
        std::process::exit(1);
    }

    // ── Logging ─────────────────────────────────────────────────────────────
    // Logs go to envsensor-tui.log so they never interfere with the display.
    //   RUST_LOG=debug cargo run --bin tui
    {
        use std::fs::File;
        if let Ok(file) = File::create("envsensor-tui.log") {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
                .target(env_logger::Target::Pipe(Box::new(file)))
                .init();
        }
    }

    let config = AppConfig::from_args(std::env::args())?;
    let simulate = std::env::args().any(|a| a == "--simulate");
    let mut app = App::new(config, simulate);

    // ── Terminal setup ────────────────────────────────────────────────────────
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    let tick = Duration::from_millis(33); // ~30 FPS

    // ── Main loop ─────────────────────────────────────────────────────────────
    loop {
        app.drain_events();
        terminal.draw(|f| draw(f, &app))?;

        if !event::poll(tick)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };

        // In raw mode Ctrl+C arrives as a key event, not SIGINT.
        let ctrl_c = key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c');
        if key.code == KeyCode::Char('q') || ctrl_c {
            break;
        }

        if app.monitor.pending_alert().is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                app.monitor.dismiss_alert();
            }
            continue;
        }

        match key.code {
            KeyCode::Esc => break,
            KeyCode::Char('c') => app.connect(),
            KeyCode::Char('d') => app.disconnect(),
            KeyCode::Char('r') => app.monitor.reset(),
            _ => {}
        }
    }

    // ── Teardown ──────────────────────────────────────────────────────────────
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    if let Some(h) = app.session.take() {
        // Blocks until both characteristics are unsubscribed and the link is closed.
        h.stop();
    }
    Ok(())
}
