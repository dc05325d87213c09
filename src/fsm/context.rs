//! Alarm context: the mutable data threaded through every state handler.

/// Inputs to, and outputs of, one alarm evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmContext {
    // --- Settings ---
    pub enabled: bool,
    /// Readings strictly above this trigger the alarm.
    pub threshold: f64,

    // --- Input ---
    /// Reading under evaluation; `None` when re-evaluating after a
    /// settings change.
    pub value: Option<f64>,

    // --- Output ---
    /// Mirrors the `Triggered` state; written by entry/exit actions.
    pub active: bool,
    /// Edge notifications produced since the last [`take_changes`](Self::take_changes).
    changes: Vec<bool>,
}

impl AlarmContext {
    pub fn new(enabled: bool, threshold: f64) -> Self {
        Self {
            enabled,
            threshold,
            value: None,
            active: false,
            changes: Vec::new(),
        }
    }

    /// Record an edge.  Called from entry/exit actions only.
    pub(crate) fn notify(&mut self, active: bool) {
        self.active = active;
        self.changes.push(active);
    }

    /// Drain pending edge notifications, oldest first.
    pub fn take_changes(&mut self) -> Vec<bool> {
        core::mem::take(&mut self.changes)
    }
}
