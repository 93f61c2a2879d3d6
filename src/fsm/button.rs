//! Parking-button FSM: debounce and press-duration classification.
//!
//! ```text
//!  RELEASED ──[press latched]──▶ PRESSED_WAIT
//!     ▲                              │ [debounce elapsed]
//!     │ [debounce elapsed]           ▼
//!  RELEASED_WAIT ◀──[line high]── PRESSED
//! ```
//!
//! The EXTI ISR latches the press edge into the port mirror; the FSM
//! consumes the latch when it acts on it, then tracks the release on the
//! raw line level (the latch cannot distinguish "held" from "released"
//! once consumed). `duration_ms` is valid only in `Released` and stays set
//! until the owner calls [`ButtonFsm::reset_duration`], so one press can
//! never classify twice.

use log::debug;

use crate::error::Result;
use crate::fsm::{Fsm, Transition};
use crate::port;
use crate::port::button as port_button;

/// States of the button debounce machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ButtonState {
    /// Idle, waiting for a press edge. The only state where `duration_ms`
    /// is meaningful.
    Released = 0,
    /// Press edge seen, waiting out the debounce window.
    PressedWait,
    /// Debounced press, waiting for the line to go back up.
    Pressed,
    /// Release seen, waiting out the debounce window.
    ReleasedWait,
}

/// Entity the button transition table runs over.
pub struct ButtonContext {
    button_id: u32,
    debounce_ms: u32,
    press_tick: u32,
    release_tick: u32,
    duration_ms: u32,
}

// ── Guards ────────────────────────────────────────────────────

fn check_pressed(ctx: &ButtonContext) -> bool {
    port_button::pressed(ctx.button_id)
}

fn check_pressed_debounced(ctx: &ButtonContext) -> bool {
    port::now_ms().wrapping_sub(ctx.press_tick) >= ctx.debounce_ms
}

fn check_released(ctx: &ButtonContext) -> bool {
    // Raw line level: high = released for the active-low switch.
    port_button::value(ctx.button_id)
}

fn check_released_debounced(ctx: &ButtonContext) -> bool {
    port::now_ms().wrapping_sub(ctx.release_tick) >= ctx.debounce_ms
}

// ── Actions ───────────────────────────────────────────────────

fn do_store_press_tick(ctx: &mut ButtonContext) {
    ctx.press_tick = port::now_ms();
    port_button::set_pressed(ctx.button_id, false);
}

fn do_set_duration(ctx: &mut ButtonContext) {
    let now = port::now_ms();
    ctx.duration_ms = now.wrapping_sub(ctx.press_tick);
    ctx.release_tick = now;
    port_button::set_pressed(ctx.button_id, false);
    debug!("button {}: press of {} ms", ctx.button_id, ctx.duration_ms);
}

static BUTTON_TRANSITIONS: [Transition<ButtonState, ButtonContext>; 4] = [
    Transition {
        from: ButtonState::Released,
        guard: check_pressed,
        to: ButtonState::PressedWait,
        action: Some(do_store_press_tick),
    },
    Transition {
        from: ButtonState::PressedWait,
        guard: check_pressed_debounced,
        to: ButtonState::Pressed,
        action: None,
    },
    Transition {
        from: ButtonState::Pressed,
        guard: check_released,
        to: ButtonState::ReleasedWait,
        action: Some(do_set_duration),
    },
    Transition {
        from: ButtonState::ReleasedWait,
        guard: check_released_debounced,
        to: ButtonState::Released,
        action: None,
    },
];

/// The button FSM: engine plus entity, owned by the master.
pub struct ButtonFsm {
    fsm: Fsm<ButtonState, ButtonContext>,
    ctx: ButtonContext,
}

impl ButtonFsm {
    /// Build the FSM and initialise the button's port mirror.
    pub fn new(debounce_ms: u32, button_id: u32) -> Result<Self> {
        port_button::init(button_id)?;
        Ok(Self {
            fsm: Fsm::new(&BUTTON_TRANSITIONS, ButtonState::Released),
            ctx: ButtonContext {
                button_id,
                debounce_ms,
                press_tick: 0,
                release_tick: 0,
                duration_ms: 0,
            },
        })
    }

    /// Evaluate the transition table once.
    pub fn fire(&mut self) -> bool {
        self.fsm.fire(&mut self.ctx)
    }

    /// Current state.
    pub fn state(&self) -> ButtonState {
        self.fsm.state()
    }

    /// Duration of the last classified press, in ms. Zero until a full
    /// press/release cycle completes and after [`Self::reset_duration`].
    pub fn duration_ms(&self) -> u32 {
        self.ctx.duration_ms
    }

    /// Clear the classified duration so the same press cannot trigger a
    /// second master transition.
    pub fn reset_duration(&mut self) {
        self.ctx.duration_ms = 0;
    }

    /// Debounce window in ms.
    pub fn debounce_ms(&self) -> u32 {
        self.ctx.debounce_ms
    }

    /// True whenever a press is in flight (any state but `Released`).
    pub fn check_activity(&self) -> bool {
        self.fsm.state() != ButtonState::Released
    }
}
