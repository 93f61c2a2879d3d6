//! Distance display FSM: renders a colour gradient on the RGB indicator.
//!
//! ```text
//!  WAIT_DISPLAY ──[enabled]──▶ SET_DISPLAY ──[new colour]──▶ SET_DISPLAY
//!       ▲                          │
//!       └───────[disabled]─────────┘
//! ```
//!
//! The colour scale runs red (danger) → yellow → green → turquoise → blue
//! (clear) across 0–200 cm, linearly interpolated inside each band; out of
//! range renders dark. While enabled and not idle the PWM duties always
//! reflect the last distance handed over by the master.

use crate::error::Result;
use crate::fsm::{Fsm, Transition};
use crate::port::display as port_display;
use crate::port::display::{
    RgbColor, COLOR_BLUE, COLOR_GREEN, COLOR_OFF, COLOR_RED, COLOR_TURQUOISE, COLOR_YELLOW,
};

/// Upper edge of the danger band (solid red at 0 cm).
pub const DANGER_MIN_CM: i32 = 0;
/// Upper edge of the warning band. Half of this is the paused-mode
/// collision-alert threshold.
pub const WARNING_MIN_CM: i32 = 25;
/// Upper edge of the no-problem band.
pub const NO_PROBLEM_MIN_CM: i32 = 50;
/// Upper edge of the info band.
pub const INFO_MIN_CM: i32 = 150;
/// Lower edge of the all-clear band.
pub const OK_MIN_CM: i32 = 175;
/// Beyond this the indicator is dark.
pub const OK_MAX_CM: i32 = 200;

/// States of the display machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DisplayState {
    /// Inactive; indicator dark.
    WaitDisplay = 0,
    /// Active; renders on each new distance, idle between them.
    SetDisplay,
}

/// Entity the display transition table runs over.
pub struct DisplayContext {
    display_id: u32,
    /// Distance to render; -1 until the first sample arrives.
    distance_cm: i32,
    new_colour: bool,
    enabled: bool,
    idle: bool,
}

// ── Colour interpolation ──────────────────────────────────────

/// Linear blend between two colours: `t = 0` gives `from`, `t = 255`
/// gives `to`.
fn interpolate_colour(from: RgbColor, to: RgbColor, t: u8) -> RgbColor {
    let blend = |a: u8, b: u8| -> u8 {
        (((255 - t as u16) * a as u16 + t as u16 * b as u16) / 255) as u8
    };
    RgbColor::new(blend(from.r, to.r), blend(from.g, to.g), blend(from.b, to.b))
}

/// Map the interpolation parameter across one distance band.
fn band_t(distance_cm: i32, lo: i32, hi: i32) -> u8 {
    ((distance_cm - lo) * 255 / (hi - lo)) as u8
}

/// Colour for a distance, per the gradient table. Distances outside
/// [0, 200] cm render dark.
pub fn colour_for_distance(distance_cm: i32) -> RgbColor {
    if (DANGER_MIN_CM..=WARNING_MIN_CM).contains(&distance_cm) {
        let t = band_t(distance_cm, DANGER_MIN_CM, WARNING_MIN_CM);
        interpolate_colour(COLOR_RED, COLOR_YELLOW, t)
    } else if distance_cm > WARNING_MIN_CM && distance_cm <= NO_PROBLEM_MIN_CM {
        let t = band_t(distance_cm, WARNING_MIN_CM, NO_PROBLEM_MIN_CM);
        interpolate_colour(COLOR_YELLOW, COLOR_GREEN, t)
    } else if distance_cm > NO_PROBLEM_MIN_CM && distance_cm <= INFO_MIN_CM {
        let t = band_t(distance_cm, NO_PROBLEM_MIN_CM, INFO_MIN_CM);
        interpolate_colour(COLOR_GREEN, COLOR_TURQUOISE, t)
    } else if distance_cm > INFO_MIN_CM && distance_cm <= OK_MIN_CM {
        let t = band_t(distance_cm, INFO_MIN_CM, OK_MIN_CM);
        interpolate_colour(COLOR_TURQUOISE, COLOR_BLUE, t)
    } else if distance_cm > OK_MIN_CM && distance_cm <= OK_MAX_CM {
        COLOR_BLUE
    } else {
        COLOR_OFF
    }
}

// ── Guards ────────────────────────────────────────────────────

fn check_active(ctx: &DisplayContext) -> bool {
    ctx.enabled
}

fn check_set_new_colour(ctx: &DisplayContext) -> bool {
    ctx.new_colour
}

fn check_off(ctx: &DisplayContext) -> bool {
    !ctx.enabled
}

// ── Actions ───────────────────────────────────────────────────

fn do_set_on(ctx: &mut DisplayContext) {
    port_display::set_rgb(ctx.display_id, COLOR_OFF);
}

fn do_set_colour(ctx: &mut DisplayContext) {
    let colour = colour_for_distance(ctx.distance_cm);
    port_display::set_rgb(ctx.display_id, colour);

    ctx.new_colour = false;
    ctx.idle = true;
}

fn do_set_off(ctx: &mut DisplayContext) {
    port_display::set_rgb(ctx.display_id, COLOR_OFF);
    ctx.idle = false;
}

static DISPLAY_TRANSITIONS: [Transition<DisplayState, DisplayContext>; 3] = [
    Transition {
        from: DisplayState::WaitDisplay,
        guard: check_active,
        to: DisplayState::SetDisplay,
        action: Some(do_set_on),
    },
    Transition {
        from: DisplayState::SetDisplay,
        guard: check_set_new_colour,
        to: DisplayState::SetDisplay,
        action: Some(do_set_colour),
    },
    Transition {
        from: DisplayState::SetDisplay,
        guard: check_off,
        to: DisplayState::WaitDisplay,
        action: Some(do_set_off),
    },
];

/// The display FSM: engine plus entity, owned by the master.
pub struct DisplayFsm {
    fsm: Fsm<DisplayState, DisplayContext>,
    ctx: DisplayContext,
}

impl DisplayFsm {
    /// Build the FSM and initialise the display's port mirror.
    pub fn new(display_id: u32) -> Result<Self> {
        port_display::init(display_id)?;
        Ok(Self {
            fsm: Fsm::new(&DISPLAY_TRANSITIONS, DisplayState::WaitDisplay),
            ctx: DisplayContext {
                display_id,
                distance_cm: -1,
                new_colour: false,
                enabled: false,
                idle: false,
            },
        })
    }

    /// Evaluate the transition table once.
    pub fn fire(&mut self) -> bool {
        self.fsm.fire(&mut self.ctx)
    }

    /// Current state.
    pub fn state(&self) -> DisplayState {
        self.fsm.state()
    }

    /// Hand over a distance to render on the next fire.
    pub fn set_distance(&mut self, distance_cm: i32) {
        self.ctx.distance_cm = distance_cm;
        self.ctx.new_colour = true;
    }

    /// Last distance handed over (-1 = none yet).
    pub fn distance_cm(&self) -> i32 {
        self.ctx.distance_cm
    }

    /// Enable or silence the indicator.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.ctx.enabled = enabled;
    }

    /// Whether the indicator is enabled.
    pub fn enabled(&self) -> bool {
        self.ctx.enabled
    }

    /// Active and with a render still pending — the display's contribution
    /// to the master's sleep gate.
    pub fn check_activity(&self) -> bool {
        self.ctx.enabled && !self.ctx.idle
    }
}
