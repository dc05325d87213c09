//! Fuzz target: notification payloads through the monitor
//!
//! Splits the input on `\n` into payloads, decodes each and feeds the
//! monitor with a small window.  Checks the window bound and the chart
//! point budget after every event.
//!
//! cargo fuzz run fuzz_monitor_ingest

#![no_main]

use libfuzzer_sys::fuzz_target;
use makesense::config::MonitorConfig;
use makesense::monitor::Monitor;
use makesense::protocol::decode_notification;

fuzz_target!(|data: &[u8]| {
    let config = MonitorConfig {
        window_capacity: 16,
        display_points: 5,
        alarm_enabled: true,
        ..MonitorConfig::default()
    };
    let Ok(mut monitor) = Monitor::new(config) else {
        return;
    };

    for payload in data.split(|b| *b == b'\n') {
        monitor.ingest(&decode_notification(payload));
        assert!(monitor.history().len() <= 16);
        assert!(monitor.display_series().len() <= 5);
        if let (Some(min), Some(max)) = (monitor.stats().min, monitor.stats().max) {
            assert!(min <= max);
        }
    }
});
