//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements  | Connects to                       |
//! |------------|-------------|-----------------------------------|
//! | `sim`      | Transport   | In-process simulated MakeSense    |
//! | `log_sink` | DisplaySink | `log` facade (console)            |

pub mod log_sink;
pub mod sim;
