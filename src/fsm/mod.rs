//! Transition-table finite state machine engine.
//!
//! Classic embedded FSM pattern expressed in safe Rust:
//!
//! ```text
//! ┌───────────────────────────────────────────────────┐
//! │  TransitionTable                                  │
//! │  ┌───────────┬──────────┬─────────┬────────────┐  │
//! │  │ from      │ guard    │ to      │ action     │  │
//! │  ├───────────┼──────────┼─────────┼────────────┤  │
//! │  │ WaitStart │ fn(&C)   │ Trigger │ fn(&mut C) │  │
//! │  │ Trigger   │ fn(&C)   │ ...     │ ...        │  │
//! │  └───────────┴──────────┴─────────┴────────────┘  │
//! └───────────────────────────────────────────────────┘
//! ```
//!
//! On each [`Fsm::fire`] the engine scans the table top-to-bottom and the
//! **first** row whose `from` matches the current state and whose guard
//! holds wins: its action (if any) runs and the machine moves to `to`.
//! Table order is the documented conflict-resolution rule.
//!
//! Each concrete machine supplies a context type `C` — the entity the
//! guards query and the actions mutate — so one engine serves every FSM in
//! the system without trait objects, heap allocation, or pointer casts.
//! Guards must be pure queries: their only non-local reads are the
//! hardware-port getters.

pub mod button;
pub mod display;
pub mod ultrasound;
pub mod urbanite;

pub use self::button::{ButtonFsm, ButtonState};
pub use self::display::{DisplayFsm, DisplayState};
pub use self::ultrasound::{UltrasoundFsm, UltrasoundState};
pub use self::urbanite::{Urbanite, UrbaniteState};

/// One row of a transition table.
/// Plain `fn` pointers — no closures, no dynamic dispatch, no heap.
pub struct Transition<S, C> {
    /// State this row applies to.
    pub from: S,
    /// Pure predicate over the context (and hardware-port getters).
    pub guard: fn(&C) -> bool,
    /// State entered when the row fires.
    pub to: S,
    /// Side effect run before the state change; `None` for a pure move.
    pub action: Option<fn(&mut C)>,
}

/// The finite state machine engine: a current state plus an ordered,
/// immutable transition table.
pub struct Fsm<S: 'static, C: 'static> {
    table: &'static [Transition<S, C>],
    current: S,
}

impl<S: Copy + PartialEq, C> Fsm<S, C> {
    /// Construct a machine over `table`, starting in `initial`.
    pub const fn new(table: &'static [Transition<S, C>], initial: S) -> Self {
        Self {
            table,
            current: initial,
        }
    }

    /// Evaluate the table once. The first matching row fires; returns
    /// whether any row did.
    pub fn fire(&mut self, ctx: &mut C) -> bool {
        for row in self.table {
            if row.from == self.current && (row.guard)(ctx) {
                if let Some(action) = row.action {
                    action(ctx);
                }
                self.current = row.to;
                return true;
            }
        }
        false
    }

    /// The current state.
    pub fn state(&self) -> S {
        self.current
    }

    /// Force the current state. Test hook; production code moves only
    /// through the table.
    pub fn set_state(&mut self, state: S) {
        self.current = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Toy {
        A,
        B,
        C,
    }

    #[derive(Default)]
    struct ToyCtx {
        go_first: bool,
        go_second: bool,
        actions_run: u32,
    }

    fn first(ctx: &ToyCtx) -> bool {
        ctx.go_first
    }

    fn second(ctx: &ToyCtx) -> bool {
        ctx.go_second
    }

    fn bump(ctx: &mut ToyCtx) {
        ctx.actions_run += 1;
    }

    static TOY_TABLE: [Transition<Toy, ToyCtx>; 3] = [
        Transition {
            from: Toy::A,
            guard: first,
            to: Toy::B,
            action: Some(bump),
        },
        Transition {
            from: Toy::A,
            guard: second,
            to: Toy::C,
            action: None,
        },
        Transition {
            from: Toy::B,
            guard: second,
            to: Toy::A,
            action: Some(bump),
        },
    ];

    #[test]
    fn no_matching_row_keeps_state() {
        let mut fsm = Fsm::new(&TOY_TABLE, Toy::A);
        let mut ctx = ToyCtx::default();
        assert!(!fsm.fire(&mut ctx));
        assert_eq!(fsm.state(), Toy::A);
        assert_eq!(ctx.actions_run, 0);
    }

    #[test]
    fn first_matching_row_wins() {
        let mut fsm = Fsm::new(&TOY_TABLE, Toy::A);
        let mut ctx = ToyCtx {
            go_first: true,
            go_second: true, // both rows eligible; table order decides
            ..Default::default()
        };
        assert!(fsm.fire(&mut ctx));
        assert_eq!(fsm.state(), Toy::B);
        assert_eq!(ctx.actions_run, 1);
    }

    #[test]
    fn pure_transition_runs_no_action() {
        let mut fsm = Fsm::new(&TOY_TABLE, Toy::A);
        let mut ctx = ToyCtx {
            go_second: true,
            ..Default::default()
        };
        assert!(fsm.fire(&mut ctx));
        assert_eq!(fsm.state(), Toy::C);
        assert_eq!(ctx.actions_run, 0);
    }

    #[test]
    fn one_row_per_fire() {
        let mut fsm = Fsm::new(&TOY_TABLE, Toy::A);
        let mut ctx = ToyCtx {
            go_first: true,
            go_second: true,
            ..Default::default()
        };
        fsm.fire(&mut ctx);
        assert_eq!(fsm.state(), Toy::B, "B->A must wait for the next fire");
        fsm.fire(&mut ctx);
        assert_eq!(fsm.state(), Toy::A);
    }

    #[test]
    fn set_state_overrides() {
        let mut fsm = Fsm::new(&TOY_TABLE, Toy::A);
        fsm.set_state(Toy::C);
        assert_eq!(fsm.state(), Toy::C);
    }
}
