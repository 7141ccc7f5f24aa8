//! Fungal-risk alert rule.
//!
//! The crop is at risk when the air is cool (12–18 °C inclusive) and the
//! relative humidity is strictly above 92 %.

use serde::{Deserialize, Serialize};

/// `true` when the default rule fires for these values.
///
/// `12 ≤ temp ≤ 18` and `hum > 92`.
pub fn evaluate(temp: f32, hum: f32) -> bool {
    AlertRule::default().check(temp, hum)
}

/// Thresholds of the fungal-risk rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertRule {
    /// Lower temperature bound in °C, inclusive.
    pub temp_min: f32,
    /// Upper temperature bound in °C, inclusive.
    pub temp_max: f32,
    /// Humidity must be strictly above this value in %RH.
    pub humidity_above: f32,
}

impl Default for AlertRule {
    fn default() -> Self {
        Self {
            temp_min: 12.0,
            temp_max: 18.0,
            humidity_above: 92.0,
        }
    }
}

impl AlertRule {
    pub fn check(&self, temp: f32, hum: f32) -> bool {
        (self.temp_min..=self.temp_max).contains(&temp) && hum > self.humidity_above
    }
}

/// When a qualifying reading surfaces the alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertMode {
    /// Every qualifying reading raises the alert again, even if the previous
    /// reading already did.
    #[default]
    EveryReading,
    /// Only a transition from "not at risk" to "at risk" raises the alert.
    OnRisingEdge,
}

/// A raised fungal-risk alert.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Alert {
    pub temperature: f32,
    pub humidity: f32,
}

impl Alert {
    pub fn title(&self) -> &'static str {
        crate::protocol::ALERT_TITLE
    }

    pub fn message(&self) -> &'static str {
        crate::protocol::ALERT_MESSAGE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries() {
        assert!(evaluate(15.0, 95.0));
        assert!(!evaluate(19.0, 95.0));
        assert!(!evaluate(15.0, 92.0));
        assert!(evaluate(12.0, 92.1));
        assert!(!evaluate(18.0, 92.0));
        assert!(evaluate(18.0, 92.5));
        assert!(!evaluate(11.99, 99.0));
        assert!(!evaluate(18.01, 99.0));
    }

    #[test]
    fn defaults_before_any_humidity_never_alert() {
        // Current humidity starts at 0 until the first humidity reading.
        assert!(!evaluate(15.0, 0.0));
    }

    #[test]
    fn custom_thresholds() {
        let rule = AlertRule {
            temp_min: 20.0,
            temp_max: 25.0,
            humidity_above: 80.0,
        };
        assert!(rule.check(22.0, 81.0));
        assert!(!rule.check(15.0, 95.0));
    }

    #[test]
    fn alert_text_is_fixed() {
        let a = Alert { temperature: 15.0, humidity: 95.0 };
        assert_eq!(a.title(), "¡Alerta!");
        assert!(a.message().starts_with("El cultivo está en riesgo"));
    }
}
