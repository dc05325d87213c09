//! Application core: client logic behind port traits.
//!
//! The link lifecycle, the telemetry monitor and their wiring live here.
//! The radio is reached only through [`ports::Transport`] and the UI only
//! through [`ports::DisplaySink`], so this layer runs unchanged against
//! the simulator in tests.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
