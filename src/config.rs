//! Monitor configuration parameters
//!
//! All user-tunable parameters for the monitor: history window, chart
//! y-axis, pause, alarm, and the display point budget.  Values are
//! changed at runtime only through the validating setters on
//! [`Monitor`](crate::monitor::Monitor); a config document can be loaded
//! from JSON at startup.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::protocol::{DEVICE_NAME, SERVICE_UUID};

/// Chart y-axis scaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum YAxisMode {
    /// Fit the retained history.
    Auto,
    /// Fixed range in µA.
    Fixed { min: f64, max: f64 },
}

impl YAxisMode {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::Auto => Ok(()),
            Self::Fixed { min, max } => {
                if !min.is_finite() || !max.is_finite() {
                    return Err(ConfigError::ValidationFailed("y_axis bounds must be finite"));
                }
                if min >= max {
                    return Err(ConfigError::ValidationFailed("y_axis min must be below max"));
                }
                Ok(())
            }
        }
    }
}

/// Which device the chooser should offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFilter {
    /// Advertised local name.
    pub name: String,
    /// Primary service UUID the client needs access to.
    pub service: u128,
}

impl Default for DeviceFilter {
    fn default() -> Self {
        Self {
            name: DEVICE_NAME.to_owned(),
            service: SERVICE_UUID,
        }
    }
}

/// Core monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    // --- History ---
    /// Retained samples (nominally 1 sample/s).
    pub window_capacity: usize,
    /// Maximum points handed to the chart after decimation.
    pub display_points: usize,

    // --- Display ---
    pub y_axis: YAxisMode,
    /// When set, incoming readings are dropped, not buffered.
    pub paused: bool,

    // --- Alarm ---
    pub alarm_enabled: bool,
    /// Readings strictly above this value (µA) trigger the alarm.
    pub alarm_threshold: f64,

    // --- Link ---
    pub device_filter: DeviceFilter,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            // History
            window_capacity: 120, // 2 minutes at 1 Hz
            display_points: 100,

            // Display
            y_axis: YAxisMode::Auto,
            paused: false,

            // Alarm
            alarm_enabled: false,
            alarm_threshold: 1.0,

            // Link
            device_filter: DeviceFilter::default(),
        }
    }
}

impl MonitorConfig {
    /// Reject values the monitor cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_capacity(self.window_capacity)?;
        validate_display_points(self.display_points)?;
        validate_threshold(self.alarm_threshold)?;
        self.y_axis.validate()?;
        if self.device_filter.name.is_empty() {
            return Err(ConfigError::ValidationFailed("device_filter.name must not be empty"));
        }
        Ok(())
    }

    /// Parse and validate a JSON config document.  Missing fields take
    /// their defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

pub(crate) fn validate_capacity(capacity: usize) -> Result<(), ConfigError> {
    if capacity == 0 {
        return Err(ConfigError::ValidationFailed("window_capacity must be >= 1"));
    }
    Ok(())
}

pub(crate) fn validate_display_points(points: usize) -> Result<(), ConfigError> {
    if points == 0 {
        return Err(ConfigError::ValidationFailed("display_points must be >= 1"));
    }
    Ok(())
}

pub(crate) fn validate_threshold(threshold: f64) -> Result<(), ConfigError> {
    if !threshold.is_finite() {
        return Err(ConfigError::ValidationFailed("alarm_threshold must be finite"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = MonitorConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.window_capacity, 120);
        assert!(!c.paused);
        assert!(!c.alarm_enabled);
        assert_eq!(c.device_filter.name, "MakeSense");
    }

    #[test]
    fn partial_json_takes_defaults() {
        let c = MonitorConfig::from_json(r#"{ "window_capacity": 600, "alarm_enabled": true }"#)
            .unwrap();
        assert_eq!(c.window_capacity, 600);
        assert!(c.alarm_enabled);
        assert_eq!(c.display_points, 100);
        assert_eq!(c.y_axis, YAxisMode::Auto);
    }

    #[test]
    fn fixed_axis_parses() {
        let c = MonitorConfig::from_json(r#"{ "y_axis": { "mode": "fixed", "min": -1.0, "max": 5.0 } }"#)
            .unwrap();
        assert_eq!(c.y_axis, YAxisMode::Fixed { min: -1.0, max: 5.0 });
    }

    #[test]
    fn invalid_values_rejected() {
        assert!(matches!(
            MonitorConfig::from_json(r#"{ "window_capacity": 0 }"#),
            Err(ConfigError::ValidationFailed(_))
        ));
        assert!(matches!(
            MonitorConfig::from_json(r#"{ "y_axis": { "mode": "fixed", "min": 2.0, "max": 1.0 } }"#),
            Err(ConfigError::ValidationFailed(_))
        ));
        assert!(matches!(
            MonitorConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
        assert!(validate_threshold(f64::NAN).is_err());
        assert!(validate_threshold(f64::INFINITY).is_err());
    }

    #[test]
    fn serde_roundtrip() {
        let mut c = MonitorConfig::default();
        c.y_axis = YAxisMode::Fixed { min: 0.0, max: 2.5 };
        c.alarm_threshold = 0.75;
        let json = serde_json::to_string(&c).unwrap();
        let c2 = MonitorConfig::from_json(&json).unwrap();
        assert_eq!(c, c2);
    }
}
