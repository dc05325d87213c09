//! Running aggregates over every accepted reading.

use serde::Serialize;

/// Minimum, maximum and count since the last reset.
///
/// `count` is not bounded by the history window: it counts every reading
/// ingested while not paused.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RunningStats {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub count: u64,
}

impl RunningStats {
    pub const fn new() -> Self {
        Self {
            min: None,
            max: None,
            count: 0,
        }
    }

    pub fn record(&mut self, value: f64) {
        self.count += 1;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
