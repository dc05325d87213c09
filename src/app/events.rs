//! Outbound application events.
//!
//! The [`Link`](crate::link::Link) publishes [`LinkEvent`]s; the
//! [`Monitor`](crate::monitor::Monitor) consumes them and publishes
//! [`DisplayEvent`]s.  Adapters on the far side decide what to do with the
//! latter (draw a chart, update a label, log to the console).

use crate::link::ConnectionState;
use crate::monitor::{DisplayPoint, RunningStats};
use crate::protocol::{Command, TelemetryEvent};

/// Events emitted by the link state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// The connection state changed.  `device_name` is set on `Connected`.
    ConnectionChanged {
        state: ConnectionState,
        device_name: Option<String>,
    },

    /// A connect attempt failed.
    Error { message: String },

    /// A decoded notification.  `seq` is the arrival order, starting at 0
    /// and never reset.
    Telemetry { seq: u64, event: TelemetryEvent },
}

/// Events emitted for the display layer.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayEvent {
    ConnectionChanged {
        state: ConnectionState,
        device_name: Option<String>,
    },
    Error(String),
    /// Latest accepted reading (µA).
    ReadingReceived(f64),
    /// Device status text, verbatim.
    StatusMessage(String),
    StatsUpdated(RunningStats),
    /// Decimated chart series, oldest first.
    DisplaySeriesUpdated(Vec<DisplayPoint>),
    AlarmChanged(bool),
    /// History, stats and current value were cleared.
    Cleared,
    /// A command was accepted by the transport.
    CommandSent(Command),
}
