//! MakeSense GATT protocol: notification decoding and command bytes.
//!
//! ## GATT Service Layout
//!
//! | Characteristic | UUID                                   | Perms       |
//! |----------------|----------------------------------------|-------------|
//! | Raw data       | `0000fff1-0000-1000-8000-00805f9b34fb` | Notify (optional) |
//! | Status         | `0000fff2-0000-1000-8000-00805f9b34fb` | Notify      |
//! | Command        | `0000fff3-0000-1000-8000-00805f9b34fb` | Write       |
//!
//! The status characteristic carries UTF-8 text.  A payload that parses
//! as a finite decimal number is a current reading in µA; anything else
//! is a human-readable status line (e.g. zeroing progress).
//!
//! Commands are single bytes written to the command characteristic.

/// 128-bit GATT UUID identifying a service or characteristic.
pub type ChannelId = u128;

// ── Constants ────────────────────────────────────────────────

/// Advertised name the device chooser filters on.
pub const DEVICE_NAME: &str = "MakeSense";

pub const SERVICE_UUID: ChannelId = 0x12345678_1234_5678_1234_56789abcdef0;
pub const CHAR_RAW_DATA: ChannelId = 0x0000fff1_0000_1000_8000_00805f9b34fb;
pub const CHAR_STATUS: ChannelId = 0x0000fff2_0000_1000_8000_00805f9b34fb;
pub const CHAR_COMMAND: ChannelId = 0x0000fff3_0000_1000_8000_00805f9b34fb;

/// Largest notification payload accepted (BLE 5 ATT MTU ceiling).
pub const MAX_PAYLOAD: usize = 512;

// ── Commands ─────────────────────────────────────────────────

/// Single-byte commands understood by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Start an on-device zero-offset calibration.
    TriggerZero = 0x01,
    StopSampling = 0x02,
    StartSampling = 0x03,
}

impl Command {
    /// Wire byte for this command.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

// ── Decoded events ───────────────────────────────────────────

/// One decoded status-channel notification.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    /// Numeric measurement.  `raw` is the decoded text before trimming.
    Reading { value: f64, raw: String },
    /// Non-numeric device text, trimmed.
    Status(String),
}

/// Decode one notification payload.
///
/// Never fails: invalid UTF-8 is replaced lossily and anything that is not
/// a finite number becomes [`TelemetryEvent::Status`].  Every payload yields
/// exactly one event.
pub fn decode_notification(payload: &[u8]) -> TelemetryEvent {
    let text = String::from_utf8_lossy(payload);
    let trimmed = text.trim();

    match parse_reading(trimmed) {
        Some(value) => TelemetryEvent::Reading {
            value,
            raw: text.into_owned(),
        },
        None => TelemetryEvent::Status(trimmed.to_owned()),
    }
}

/// Strict numeric parse: the whole string must be a number, and it must be
/// finite (`"inf"` / `"NaN"` are status text, not readings).
fn parse_reading(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Presentation hint for a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    /// Zero calibration in progress.
    Zeroing,
    /// Device ready, or an operation finished.
    Ready,
    Neutral,
}

/// Classify device status text.  Firmware messages are Chinese; English
/// equivalents are accepted too.
pub fn status_tone(text: &str) -> StatusTone {
    let lower = text.to_lowercase();
    if text.contains("调零") || lower.contains("zero") {
        StatusTone::Zeroing
    } else if ["就绪", "完成"].iter().any(|k| text.contains(k))
        || ["ready", "done", "complete"].iter().any(|k| lower.contains(k))
    {
        StatusTone::Ready
    } else {
        StatusTone::Neutral
    }
}

/// Render a UUID in canonical 8-4-4-4-12 form.
pub fn format_uuid(id: ChannelId) -> String {
    let hex = format!("{id:032x}");
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

// ── Tests ────────────────────────────────────────────────────
