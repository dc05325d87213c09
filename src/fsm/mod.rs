//! Function-pointer finite state machine engine, driving the threshold
//! alarm.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  StateTable                                              │
//! │  ┌───────────┬───────────┬──────────┬─────────────────┐  │
//! │  │ StateId   │ on_enter  │ on_exit  │ on_update       │  │
//! │  ├───────────┼───────────┼──────────┼─────────────────┤  │
//! │  │ Clear     │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option │  │
//! │  │ Triggered │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option │  │
//! │  └───────────┴───────────┴──────────┴─────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Each evaluation the engine calls `on_update` for the **current** state.
//! If it returns `Some(next_id)`, the engine runs `on_exit` for the
//! current state, then `on_enter` for the next, and updates the
//! current pointer.  All functions receive `&mut AlarmContext`, which
//! carries the reading under evaluation, the alarm settings, and the
//! pending change notifications the actions produce.

pub mod context;
pub mod states;

use context::AlarmContext;
use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Alarm states.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Clear = 0,
    Triggered = 1,
}

impl StateId {
    pub const COUNT: usize = 2;

    /// Convert an index back to `StateId`.  Out-of-range falls back to
    /// `Clear` (asserts in debug builds).
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Clear,
            1 => Self::Triggered,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Clear
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
/// These run exactly once on each state transition.
pub type StateActionFn = fn(&mut AlarmContext);

/// Signature for the per-evaluation update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut AlarmContext) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    current: usize,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        debug_assert!(
            table.iter().enumerate().all(|(i, d)| d.id as usize == i),
            "state table out of order"
        );
        Self {
            table,
            current: initial as usize,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    pub fn start(&mut self, ctx: &mut AlarmContext) {
        info!("Alarm FSM starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Evaluate the current state once against `ctx`.
    pub fn tick(&mut self, ctx: &mut AlarmContext) {
        let next = (self.table[self.current].on_update)(ctx);
        if let Some(next_id) = next {
            if next_id as usize != self.current {
                self.transition(next_id, ctx);
            }
        }
    }

    /// Jump to `next` regardless of what `on_update` would say.
    /// No-op if already there.
    pub fn force_transition(&mut self, next: StateId, ctx: &mut AlarmContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    fn transition(&mut self, next_id: StateId, ctx: &mut AlarmContext) {
        let next_idx = next_id as usize;

        info!(
            "Alarm transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn changes_alternate_and_track_state(
            values in proptest::collection::vec(-10.0f64..10.0, 1..200),
            threshold in -5.0f64..5.0,
        ) {
            let mut fsm = Fsm::new(states::build_state_table(), StateId::Clear);
            let mut ctx = AlarmContext::new(true, threshold);
            fsm.start(&mut ctx);

            let mut expected = false;
            for v in values {
                ctx.value = Some(v);
                fsm.tick(&mut ctx);
                for change in ctx.take_changes() {
                    prop_assert_ne!(change, expected, "notification without an edge");
                    expected = change;
                }
                prop_assert_eq!(fsm.current_state() == StateId::Triggered, v > threshold);
                prop_assert_eq!(ctx.active, expected);
            }
        }
    }
}
