use log::{debug, info};

use crate::alert::{Alert, AlertMode, AlertRule};
use crate::series::Series;
use crate::types::{Channel, Reading, SensorEvent, SessionState};

/// Everything the presentation layer displays.
///
/// Owned by the UI thread.  The session worker never touches it directly;
/// it posts [`SensorEvent`]s which the UI thread feeds into [`Monitor::apply`].
#[derive(Debug, Clone)]
pub struct Monitor {
    temperature: Series,
    humidity: Series,
    current_temp: f32,
    current_hum: f32,
    status: SessionState,
    rule: AlertRule,
    mode: AlertMode,
    at_risk: bool,
    alert: Option<Alert>,
    alerts_raised: u64,
}

impl Monitor {
    pub fn new(rule: AlertRule, mode: AlertMode) -> Self {
        Self::with_capacity(crate::protocol::SERIES_CAPACITY, rule, mode)
    }

    pub fn with_capacity(capacity: usize, rule: AlertRule, mode: AlertMode) -> Self {
        Self {
            temperature: Series::with_capacity(capacity),
            humidity: Series::with_capacity(capacity),
            current_temp: 0.0,
            current_hum: 0.0,
            status: SessionState::Disconnected,
            rule,
            mode,
            at_risk: false,
            alert: None,
            alerts_raised: 0,
        }
    }

    /// Apply one event from the session worker.
    ///
    /// Returns the alert raised by this event, if any.
    pub fn apply(&mut self, event: SensorEvent) -> Option<Alert> {
        match event {
            SensorEvent::State(state) => {
                info!("Session state: {state}");
                self.status = state;
                None
            }
            SensorEvent::Reading(reading) => self.record(reading),
        }
    }

    /// Append a reading to its channel, update the current value, and run the
    /// alert rule against both current values.
    pub fn record(&mut self, reading: Reading) -> Option<Alert> {
        match reading.channel {
            Channel::Temperature => {
                self.temperature.append(reading.value);
                self.current_temp = reading.value;
            }
            Channel::Humidity => {
                self.humidity.append(reading.value);
                self.current_hum = reading.value;
            }
        }
        debug!("{} = {:.2} {}", reading.channel, reading.value, reading.channel.unit());

        let at_risk = self.rule.check(self.current_temp, self.current_hum);
        let raise = match self.mode {
            AlertMode::EveryReading => at_risk,
            AlertMode::OnRisingEdge => at_risk && !self.at_risk,
        };
        self.at_risk = at_risk;

        if !raise {
            return None;
        }
        let alert = Alert {
            temperature: self.current_temp,
            humidity: self.current_hum,
        };
        self.alerts_raised += 1;
        self.alert = Some(alert);
        info!(
            "Fungal-risk alert #{}: {:.1} °C, {:.1} %",
            self.alerts_raised, alert.temperature, alert.humidity
        );
        Some(alert)
    }

    /// Empty both series and zero both current values.
    pub fn reset(&mut self) {
        self.temperature.reset();
        self.humidity.reset();
        self.current_temp = 0.0;
        self.current_hum = 0.0;
        self.at_risk = false;
    }

    /// Close the alert modal.
    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    pub fn series(&self, channel: Channel) -> &Series {
        match channel {
            Channel::Temperature => &self.temperature,
            Channel::Humidity => &self.humidity,
        }
    }

    pub fn current(&self, channel: Channel) -> f32 {
        match channel {
            Channel::Temperature => self.current_temp,
            Channel::Humidity => self.current_hum,
        }
    }

    /// Label text such as `"Temperature: 15.0 °C"`.
    pub fn label(&self, channel: Channel) -> String {
        format!("{channel}: {:.1} {}", self.current(channel), channel.unit())
    }

    pub fn status(&self) -> &SessionState {
        &self.status
    }

    pub fn pending_alert(&self) -> Option<&Alert> {
        self.alert.as_ref()
    }

    pub fn alerts_raised(&self) -> u64 {
        self.alerts_raised
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new(AlertRule::default(), AlertMode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp(v: f32) -> Reading {
        Reading { channel: Channel::Temperature, value: v }
    }

    fn hum(v: f32) -> Reading {
        Reading { channel: Channel::Humidity, value: v }
    }

    #[test]
    fn current_values_start_at_zero() {
        let m = Monitor::default();
        assert_eq!(m.current(Channel::Temperature), 0.0);
        assert_eq!(m.current(Channel::Humidity), 0.0);
        assert_eq!(m.label(Channel::Temperature), "Temperature: 0.0 °C");
        assert_eq!(m.label(Channel::Humidity), "Humidity: 0.0 %");
        assert_eq!(m.status(), &SessionState::Disconnected);
    }

    #[test]
    fn records_into_the_matching_series() {
        let mut m = Monitor::default();
        assert!(m.record(temp(15.0)).is_none());
        assert_eq!(m.series(Channel::Temperature).snapshot(), vec![(0.0, 15.0)]);
        assert!(m.series(Channel::Humidity).is_empty());
        assert_eq!(m.current(Channel::Temperature), 15.0);

        let alert = m.record(hum(95.0)).expect("alert");
        assert_eq!(alert, Alert { temperature: 15.0, humidity: 95.0 });
        assert_eq!(m.pending_alert(), Some(&alert));
        assert_eq!(m.label(Channel::Humidity), "Humidity: 95.0 %");
    }

    #[test]
    fn every_reading_mode_repeats_alerts() {
        let mut m = Monitor::default();
        m.record(temp(15.0));
        assert!(m.record(hum(95.0)).is_some());
        assert!(m.record(hum(96.0)).is_some());
        assert!(m.record(temp(14.0)).is_some());
        assert_eq!(m.alerts_raised(), 3);
    }

    #[test]
    fn rising_edge_mode_alerts_once_per_episode() {
        let mut m = Monitor::new(AlertRule::default(), AlertMode::OnRisingEdge);
        m.record(temp(15.0));
        assert!(m.record(hum(95.0)).is_some());
        assert!(m.record(hum(96.0)).is_none());
        assert!(m.record(hum(80.0)).is_none());
        assert!(m.record(hum(93.0)).is_some());
        assert_eq!(m.alerts_raised(), 2);
    }

    #[test]
    fn reset_clears_series_and_values() {
        let mut m = Monitor::default();
        for i in 0..150 {
            m.record(temp(i as f32 / 10.0));
            m.record(hum(50.0));
        }
        assert_eq!(m.series(Channel::Temperature).len(), 100);

        m.reset();
        assert!(m.series(Channel::Temperature).snapshot().is_empty());
        assert!(m.series(Channel::Humidity).snapshot().is_empty());
        assert_eq!(m.current(Channel::Temperature), 0.0);
        assert_eq!(m.current(Channel::Humidity), 0.0);
    }

    #[test]
    fn dismiss_closes_the_modal_only() {
        let mut m = Monitor::default();
        m.record(temp(15.0));
        m.record(hum(95.0));
        m.dismiss_alert();
        assert!(m.pending_alert().is_none());
        assert_eq!(m.alerts_raised(), 1);
    }

    #[test]
    fn state_events_update_status() {
        let mut m = Monitor::default();
        m.apply(SensorEvent::State(SessionState::Scanning));
        assert_eq!(m.status(), &SessionState::Scanning);
        m.apply(SensorEvent::State(SessionState::Error("device not found".into())));
        assert_eq!(m.status().to_string(), "Error: device not found");
    }
}
