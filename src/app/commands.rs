//! Inbound commands to the application service.
//!
//! These represent actions requested by the UI (buttons, toggles, numeric
//! inputs) that the [`MonitorService`](super::service::MonitorService)
//! interprets and acts upon.

use crate::config::YAxisMode;
use crate::protocol::Command;

/// Commands that UI adapters can send into the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// Connect if disconnected, disconnect otherwise (the connect button).
    ToggleConnection,
    Connect,
    Disconnect,

    /// Write a device command (zero calibration, start/stop sampling).
    Device(Command),

    /// Clear history, statistics and alarm.
    Clear,

    /// Change the retained window (samples).
    SetWindow(usize),
    SetYAxis(YAxisMode),
    SetPaused(bool),
    SetAlarmEnabled(bool),
    SetAlarmThreshold(f64),
}
