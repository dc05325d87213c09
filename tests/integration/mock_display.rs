//! Recording display sink for integration tests.
//!
//! Captures every display event so tests can assert on the full history
//! the UI would have seen.

use std::cell::RefCell;
use std::rc::Rc;

use makesense::app::events::DisplayEvent;
use makesense::app::ports::DisplaySink;
use makesense::link::ConnectionState;

/// Cloneable handle: give one clone to the service, keep one to inspect.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Rc<RefCell<Vec<DisplayEvent>>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DisplayEvent> {
        self.events.borrow().clone()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    pub fn connection_states(&self) -> Vec<ConnectionState> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                DisplayEvent::ConnectionChanged { state, .. } => Some(*state),
                _ => None,
            })
            .collect()
    }

    pub fn alarm_changes(&self) -> Vec<bool> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                DisplayEvent::AlarmChanged(a) => Some(*a),
                _ => None,
            })
            .collect()
    }

    pub fn readings(&self) -> Vec<f64> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                DisplayEvent::ReadingReceived(v) => Some(*v),
                _ => None,
            })
            .collect()
    }

    pub fn status_messages(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                DisplayEvent::StatusMessage(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                DisplayEvent::Error(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn series_updates(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| matches!(e, DisplayEvent::DisplaySeriesUpdated(_)))
            .count()
    }
}

impl DisplaySink for RecordingSink {
    fn on_event(&mut self, event: &DisplayEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}
