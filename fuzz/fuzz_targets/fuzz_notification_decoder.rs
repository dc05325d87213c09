//! Fuzz target: `decode_notification`
//!
//! Arbitrary bytes must decode to exactly one event without panicking.
//! Readings must be finite; status text must come back trimmed.
//!
//! cargo fuzz run fuzz_notification_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use makesense::protocol::{decode_notification, TelemetryEvent};

fuzz_target!(|data: &[u8]| {
    match decode_notification(data) {
        TelemetryEvent::Reading { value, raw } => {
            assert!(value.is_finite(), "non-finite reading");
            assert_eq!(raw.trim().parse::<f64>().ok(), Some(value));
        }
        TelemetryEvent::Status(text) => {
            assert_eq!(text.trim(), text, "status text not trimmed");
        }
    }
});
