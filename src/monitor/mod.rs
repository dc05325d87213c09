//! Streaming reduction engine.
//!
//! Consumes [`LinkEvent`]s and maintains everything the display needs:
//!
//! ```text
//!  Reading ──▶ History (bounded, FIFO) ──▶ decimate ──▶ DisplaySeriesUpdated
//!     │                                       ▲
//!     ├──▶ RunningStats ──▶ StatsUpdated      │ (only when dirty)
//!     │                                       │
//!     └──▶ Alarm FSM ──▶ AlarmChanged    refresh_display()
//! ```
//!
//! Per-reading work is O(1) amortised.  Decimation is O(window) and runs
//! only from [`Monitor::refresh_display`] (or a series query) when new data
//! arrived since the last one.

pub mod decimate;
pub mod history;
pub mod stats;

use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::Serialize;

use crate::app::events::{DisplayEvent, LinkEvent};
use crate::config::{self, MonitorConfig, YAxisMode};
use crate::error::ConfigError;
use crate::events::{EventBus, SubscriptionId};
use crate::fsm::context::AlarmContext;
use crate::fsm::{states, Fsm, StateId};
use crate::link::ConnectionState;
use crate::protocol::{Command, TelemetryEvent};

pub use history::{History, Sample};
pub use stats::RunningStats;

/// One chart point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DisplayPoint {
    /// Seconds since the session started.
    pub elapsed_secs: f64,
    pub value: f64,
}

/// One exported history row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportRow {
    /// Time since the session started.
    pub elapsed: Duration,
    pub value: f64,
}

/// Bounded history, running statistics, decimated series and alarm.
pub struct Monitor {
    config: MonitorConfig,
    started: Instant,

    history: History,
    stats: RunningStats,
    current: Option<f64>,
    last_seq: Option<u64>,

    alarm: Fsm,
    alarm_ctx: AlarmContext,

    connection: ConnectionState,
    device_name: Option<String>,

    /// Decimated view of `history`, valid unless `series_stale`.
    series: Vec<DisplayPoint>,
    series_stale: bool,
    /// The published series is out of date.
    unpublished: bool,

    bus: EventBus<DisplayEvent>,
}

impl Monitor {
    /// Build a monitor whose session starts now.
    pub fn new(config: MonitorConfig) -> Result<Self, ConfigError> {
        Self::with_start(config, Instant::now())
    }

    /// Build a monitor with an explicit session start instant.
    pub fn with_start(config: MonitorConfig, started: Instant) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut alarm = Fsm::new(states::build_state_table(), StateId::Clear);
        let mut alarm_ctx = AlarmContext::new(config.alarm_enabled, config.alarm_threshold);
        alarm.start(&mut alarm_ctx);

        Ok(Self {
            history: History::new(config.window_capacity),
            stats: RunningStats::new(),
            current: None,
            last_seq: None,
            alarm,
            alarm_ctx,
            connection: ConnectionState::Disconnected,
            device_name: None,
            series: Vec::new(),
            series_stale: false,
            unpublished: false,
            bus: EventBus::new(),
            started,
            config,
        })
    }

    // ── Subscribers ───────────────────────────────────────────

    /// Register a display handler.  Handlers must not call back into the
    /// monitor.
    pub fn subscribe(&mut self, handler: impl FnMut(&DisplayEvent) + 'static) -> SubscriptionId {
        self.bus.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    // ── Inbound ───────────────────────────────────────────────

    /// Apply one link event, timestamping readings with the current time.
    pub fn handle_link_event(&mut self, event: &LinkEvent) {
        self.handle_link_event_at(event, Instant::now());
    }

    /// Apply one link event, timestamping readings with `at`.
    pub fn handle_link_event_at(&mut self, event: &LinkEvent, at: Instant) {
        match event {
            LinkEvent::ConnectionChanged { state, device_name } => {
                self.on_connection_changed(*state, device_name.clone());
            }
            LinkEvent::Error { message } => {
                self.bus.publish(&DisplayEvent::Error(message.clone()));
            }
            LinkEvent::Telemetry { seq, event } => {
                if let Some(last) = self.last_seq {
                    if *seq <= last {
                        warn!("Monitor: ignoring out-of-order telemetry #{seq} (last #{last})");
                        return;
                    }
                }
                self.last_seq = Some(*seq);
                self.ingest_at(event, at);
            }
        }
    }

    /// Apply one decoded telemetry event.
    pub fn ingest(&mut self, event: &TelemetryEvent) {
        self.ingest_at(event, Instant::now());
    }

    pub fn ingest_at(&mut self, event: &TelemetryEvent, at: Instant) {
        match event {
            TelemetryEvent::Reading { value, .. } => self.record_reading(*value, at),
            TelemetryEvent::Status(text) => {
                self.bus.publish(&DisplayEvent::StatusMessage(text.clone()));
            }
        }
    }

    /// Report that `cmd` was accepted by the transport.
    pub fn note_command_sent(&mut self, cmd: Command) {
        self.bus.publish(&DisplayEvent::CommandSent(cmd));
    }

    // ── Settings ──────────────────────────────────────────────

    /// Change the retained window.  Keeps the newest samples, then
    /// republishes the series.  Statistics are untouched.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<(), ConfigError> {
        config::validate_capacity(capacity)?;
        let dropped = self.history.set_capacity(capacity);
        self.config.window_capacity = capacity;
        info!("Monitor: window set to {capacity} samples ({dropped} dropped)");
        self.mark_dirty();
        self.refresh_display();
        Ok(())
    }

    /// Change the chart point budget and republish the series.
    pub fn set_display_points(&mut self, points: usize) -> Result<(), ConfigError> {
        config::validate_display_points(points)?;
        self.config.display_points = points;
        self.mark_dirty();
        self.refresh_display();
        Ok(())
    }

    pub fn set_y_axis(&mut self, mode: YAxisMode) -> Result<(), ConfigError> {
        mode.validate()?;
        self.config.y_axis = mode;
        Ok(())
    }

    /// While paused, readings are dropped entirely.
    pub fn set_paused(&mut self, paused: bool) {
        if self.config.paused != paused {
            info!("Monitor: {}", if paused { "paused" } else { "resumed" });
        }
        self.config.paused = paused;
    }

    /// Disabling also clears a triggered alarm.
    pub fn set_alarm_enabled(&mut self, enabled: bool) {
        self.config.alarm_enabled = enabled;
        self.alarm_ctx.enabled = enabled;
        if !enabled {
            self.alarm_ctx.value = None;
            self.alarm.tick(&mut self.alarm_ctx);
            self.publish_alarm_changes();
        }
    }

    /// New threshold applies from the next reading.
    pub fn set_alarm_threshold(&mut self, threshold: f64) -> Result<(), ConfigError> {
        config::validate_threshold(threshold)?;
        self.config.alarm_threshold = threshold;
        self.alarm_ctx.threshold = threshold;
        Ok(())
    }

    /// Empty the history, reset statistics, clear the alarm and the
    /// current value.
    pub fn reset(&mut self) {
        self.history.clear();
        self.stats.reset();
        self.current = None;
        self.alarm.force_transition(StateId::Clear, &mut self.alarm_ctx);
        info!("Monitor: cleared");

        self.bus.publish(&DisplayEvent::Cleared);
        self.publish_alarm_changes();
        self.bus.publish(&DisplayEvent::StatsUpdated(self.stats));
        self.mark_dirty();
        self.refresh_display();
    }

    // ── Display ───────────────────────────────────────────────

    /// Publish the decimated series if anything changed since the last
    /// publish.  Returns whether an event was published.
    pub fn refresh_display(&mut self) -> bool {
        if !self.unpublished {
            return false;
        }
        self.recompute_series();
        self.unpublished = false;
        self.bus
            .publish(&DisplayEvent::DisplaySeriesUpdated(self.series.clone()));
        true
    }

    /// The decimated series, oldest first.
    pub fn display_series(&mut self) -> &[DisplayPoint] {
        self.recompute_series();
        &self.series
    }

    /// Y-axis range for the chart: the fixed range, or the retained
    /// history's extent in auto mode.
    pub fn y_bounds(&self) -> Option<(f64, f64)> {
        match self.config.y_axis {
            YAxisMode::Fixed { min, max } => Some((min, max)),
            YAxisMode::Auto => self.history.value_range(),
        }
    }

    /// Full retained history (not decimated), oldest first.
    pub fn export(&self) -> Vec<ExportRow> {
        self.history
            .iter()
            .map(|s| ExportRow {
                elapsed: s.timestamp.saturating_duration_since(self.started),
                value: s.value,
            })
            .collect()
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn stats(&self) -> RunningStats {
        self.stats
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn current_value(&self) -> Option<f64> {
        self.current
    }

    pub fn alarm_active(&self) -> bool {
        self.alarm.current_state() == StateId::Triggered
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    pub fn device_name(&self) -> Option<&str> {
        self.device_name.as_deref()
    }

    // ── Internal ──────────────────────────────────────────────

    fn record_reading(&mut self, value: f64, at: Instant) {
        if self.config.paused {
            debug!("Monitor: paused, dropping reading {value}");
            return;
        }

        self.history.push(Sample {
            timestamp: at,
            value,
        });
        self.stats.record(value);
        self.current = Some(value);

        self.alarm_ctx.value = Some(value);
        self.alarm.tick(&mut self.alarm_ctx);

        self.bus.publish(&DisplayEvent::ReadingReceived(value));
        self.bus.publish(&DisplayEvent::StatsUpdated(self.stats));
        self.publish_alarm_changes();
        self.mark_dirty();
    }

    fn on_connection_changed(&mut self, state: ConnectionState, device_name: Option<String>) {
        self.connection = state;
        self.device_name = device_name.clone();
        self.bus
            .publish(&DisplayEvent::ConnectionChanged { state, device_name });

        if state == ConnectionState::Disconnected {
            self.alarm.force_transition(StateId::Clear, &mut self.alarm_ctx);
            self.publish_alarm_changes();
        }
    }

    fn publish_alarm_changes(&mut self) {
        for active in self.alarm_ctx.take_changes() {
            self.bus.publish(&DisplayEvent::AlarmChanged(active));
        }
    }

    fn mark_dirty(&mut self) {
        self.series_stale = true;
        self.unpublished = true;
    }

    fn recompute_series(&mut self) {
        if !self.series_stale {
            return;
        }
        let started = self.started;
        self.series = decimate::decimate(
            self.history.iter().map(|s| DisplayPoint {
                elapsed_secs: s.timestamp.saturating_duration_since(started).as_secs_f64(),
                value: s.value,
            }),
            self.config.display_points,
        );
        self.series_stale = false;
    }
}
