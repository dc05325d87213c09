//! Log-based display sink adapter.
//!
//! Implements [`DisplaySink`] by writing display events to the `log`
//! facade, one `TAG | key=value` line per event.  The host binary uses it
//! in place of a chart; a GUI adapter would implement the same trait.

use log::{info, warn};

use crate::app::events::DisplayEvent;
use crate::app::ports::DisplaySink;
use crate::protocol::{status_tone, StatusTone};

/// Adapter that logs every [`DisplayEvent`].
#[derive(Debug, Default)]
pub struct LogDisplaySink;

impl LogDisplaySink {
    pub fn new() -> Self {
        Self
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map_or_else(|| "--".to_owned(), |v| format!("{v:.3}"))
}

impl DisplaySink for LogDisplaySink {
    fn on_event(&mut self, event: &DisplayEvent) {
        match event {
            DisplayEvent::ConnectionChanged { state, device_name } => {
                info!(
                    "CONN | state={} device={}",
                    state,
                    device_name.as_deref().unwrap_or("-")
                );
            }
            DisplayEvent::Error(message) => {
                warn!("ERROR | {message}");
            }
            DisplayEvent::ReadingReceived(value) => {
                info!("READ | value={value:.3}uA");
            }
            DisplayEvent::StatusMessage(text) => {
                let tone = match status_tone(text) {
                    StatusTone::Zeroing => "zeroing",
                    StatusTone::Ready => "ready",
                    StatusTone::Neutral => "info",
                };
                info!("STATUS | tone={tone} | {text}");
            }
            DisplayEvent::StatsUpdated(stats) => {
                info!(
                    "STATS | min={} max={} count={}",
                    fmt_opt(stats.min),
                    fmt_opt(stats.max),
                    stats.count
                );
            }
            DisplayEvent::DisplaySeriesUpdated(points) => {
                match (points.first(), points.last()) {
                    (Some(first), Some(last)) => info!(
                        "SERIES | points={} span={:.1}s..{:.1}s",
                        points.len(),
                        first.elapsed_secs,
                        last.elapsed_secs
                    ),
                    _ => info!("SERIES | points=0"),
                }
            }
            DisplayEvent::AlarmChanged(active) => {
                if *active {
                    warn!("ALARM | active=true");
                } else {
                    info!("ALARM | active=false");
                }
            }
            DisplayEvent::Cleared => {
                info!("CLEAR | history and stats reset");
            }
            DisplayEvent::CommandSent(cmd) => {
                info!("CMD | {:?} (0x{:02x})", cmd, cmd.code());
            }
        }
    }
}
