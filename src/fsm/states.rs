//! Alarm state handlers and table builder.
//!
//! ```text
//!  CLEAR ──[enabled && value > threshold]──▶ TRIGGERED
//!    ▲                                           │
//!    └──[value <= threshold || disabled]─────────┘
//! ```
//!
//! Notifications come from the `Triggered` entry and exit actions, so a
//! change is reported exactly once per edge no matter how the edge was
//! reached (reading, disable, forced clear).

use super::context::AlarmContext;
use super::{StateDescriptor, StateId};
use log::{info, warn};

/// Build the static state table.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Clear
        StateDescriptor {
            id: StateId::Clear,
            name: "Clear",
            on_enter: None,
            on_exit: None,
            on_update: clear_update,
        },
        // Index 1: Triggered
        StateDescriptor {
            id: StateId::Triggered,
            name: "Triggered",
            on_enter: Some(triggered_enter),
            on_exit: Some(triggered_exit),
            on_update: triggered_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  CLEAR state
// ═══════════════════════════════════════════════════════════════════════════

fn clear_update(ctx: &mut AlarmContext) -> Option<StateId> {
    if !ctx.enabled {
        return None;
    }
    match ctx.value {
        Some(v) if v > ctx.threshold => Some(StateId::Triggered),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  TRIGGERED state
// ═══════════════════════════════════════════════════════════════════════════

fn triggered_enter(ctx: &mut AlarmContext) {
    warn!(
        "Alarm raised: {:.3} uA > threshold {:.3} uA",
        ctx.value.unwrap_or(f64::NAN),
        ctx.threshold
    );
    ctx.notify(true);
}

fn triggered_exit(ctx: &mut AlarmContext) {
    info!("Alarm cleared");
    ctx.notify(false);
}

fn triggered_update(ctx: &mut AlarmContext) -> Option<StateId> {
    if !ctx.enabled {
        return Some(StateId::Clear);
    }
    match ctx.value {
        Some(v) if v <= ctx.threshold => Some(StateId::Clear),
        _ => None,
    }
}
