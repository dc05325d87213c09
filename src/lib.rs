//! MakeSense picoammeter client library.
//!
//! Connection lifecycle and notification decoding for the MakeSense BLE
//! current sensor, plus the streaming engine that turns readings into a
//! bounded chart series, running statistics and a threshold alarm.  The
//! radio is abstracted behind [`app::ports::Transport`]; the
//! [`adapters::sim`] transport drives everything on the host.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod fsm;
pub mod link;
pub mod monitor;
pub mod protocol;
