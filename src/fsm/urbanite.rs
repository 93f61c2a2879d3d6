//! Urbanite master FSM: multiplexes user intent, sensor readiness and
//! power state.
//!
//! ```text
//!                 ┌──────[no activity]──────▶ SLEEP_WHILE_OFF ─┐
//!   ┌──▶ OFF ◀────┴─────────────[activity]────────────────────┘
//!   │     │ [press ≥ on/off]
//!   │     ▼
//!   │  MEASURE ──[no activity]──▶ SLEEP_WHILE_ON ──[sample pending]──┐
//!   │     ▲ ◀────────────────────────────────────────────────────────┘
//!   │     │ [press ≥ emergency]
//!   │     ▼
//!   │  EMERGENCY (flash 0 cm / 500 cm, 1 s dwell)
//!   │     │ [press ≥ emergency]
//!   └─────┴──[on/off ≤ press < emergency]
//! ```
//!
//! The master exclusively owns the three leaves and fires them before its
//! own table on every iteration; the leaves expose query methods only.
//! Press windows classify the button's measured duration: pause <
//! on/off < emergency, validated at startup. Every consumed
//! classification resets the duration so one press moves the system once.

use log::info;

use crate::config::SystemConfig;
use crate::fsm::display::WARNING_MIN_CM;
use crate::fsm::{ButtonFsm, DisplayFsm, Fsm, Transition, UltrasoundFsm};
use crate::port;

/// States of the master machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum UrbaniteState {
    /// Powered down; leaves disarmed.
    Off = 0,
    /// Measuring and displaying distance.
    Measure,
    /// Low-power wait while powered down.
    SleepWhileOff,
    /// Low-power wait between measurements.
    SleepWhileOn,
    /// Driver alert: ultrasound stopped, display flashing.
    Emergency,
}

/// Entity the master transition table runs over. Owns the leaf FSMs.
pub struct UrbaniteContext {
    button: ButtonFsm,
    ultrasound: UltrasoundFsm,
    display: DisplayFsm,

    on_off_press_ms: u32,
    pause_display_ms: u32,
    emergency_press_ms: u32,
    emergency_flash_ms: u32,

    paused: bool,
    emergency: bool,
    /// True while the danger phase (0 cm) is the next to render.
    emergency_phase: bool,
    /// Wall-clock deadline of the next flash phase change.
    next_phase_at_ms: u32,
}

// ── Guards ────────────────────────────────────────────────────

fn check_on(ctx: &UrbaniteContext) -> bool {
    let duration = ctx.button.duration_ms();
    duration > 0 && duration >= ctx.on_off_press_ms
}

fn check_off(ctx: &UrbaniteContext) -> bool {
    let duration = ctx.button.duration_ms();
    duration > 0 && duration >= ctx.on_off_press_ms && duration < ctx.emergency_press_ms
}

fn check_emergency_on(ctx: &UrbaniteContext) -> bool {
    let duration = ctx.button.duration_ms();
    duration > 0 && duration >= ctx.emergency_press_ms
}

fn check_emergency_off(ctx: &UrbaniteContext) -> bool {
    check_emergency_on(ctx)
}

fn check_emergency_continue(ctx: &UrbaniteContext) -> bool {
    ctx.emergency
}

fn check_pause_display(ctx: &UrbaniteContext) -> bool {
    let duration = ctx.button.duration_ms();
    duration > 0 && duration >= ctx.pause_display_ms && duration < ctx.on_off_press_ms
}

fn check_new_measure(ctx: &UrbaniteContext) -> bool {
    ctx.ultrasound.new_sample_ready()
}

fn check_activity(ctx: &UrbaniteContext) -> bool {
    ctx.button.check_activity() || ctx.ultrasound.check_activity() || ctx.display.check_activity()
}

fn check_no_activity(ctx: &UrbaniteContext) -> bool {
    !check_activity(ctx)
}

fn check_activity_in_measure(ctx: &UrbaniteContext) -> bool {
    check_new_measure(ctx)
}

// ── Actions ───────────────────────────────────────────────────

fn do_start_up_measure(ctx: &mut UrbaniteContext) {
    ctx.button.reset_duration();
    ctx.ultrasound.start();
    ctx.display.set_enabled(true);
    info!("[{}] urbanite: system ON", port::now_ms());
}

fn do_stop_urbanite(ctx: &mut UrbaniteContext) {
    ctx.button.reset_duration();
    ctx.ultrasound.stop();
    ctx.display.set_enabled(false);
    ctx.paused = false;
    info!("[{}] urbanite: system OFF", port::now_ms());
}

fn do_pause_display(ctx: &mut UrbaniteContext) {
    ctx.button.reset_duration();
    ctx.paused = !ctx.paused;
    ctx.display.set_enabled(!ctx.paused);
    if ctx.paused {
        info!("[{}] urbanite: display PAUSED", port::now_ms());
    } else {
        info!("[{}] urbanite: display RESUMED", port::now_ms());
    }
}

fn do_display_distance(ctx: &mut UrbaniteContext) {
    let distance_cm = ctx.ultrasound.distance_cm();

    if ctx.paused {
        // Paused still alerts on imminent collision.
        if (distance_cm as i32) < WARNING_MIN_CM / 2 {
            ctx.display.set_distance(distance_cm as i32);
            ctx.display.set_enabled(true);
        } else {
            ctx.display.set_enabled(false);
        }
    } else {
        ctx.display.set_distance(distance_cm as i32);
    }

    info!("[{}] urbanite: distance {} cm", port::now_ms(), distance_cm);
}

fn do_start_emergency(ctx: &mut UrbaniteContext) {
    ctx.button.reset_duration();
    ctx.display.set_enabled(true);
    ctx.ultrasound.stop();

    ctx.emergency = true;
    ctx.emergency_phase = true;
    ctx.next_phase_at_ms = port::now_ms();
    info!("[{}] urbanite: EMERGENCY ON", port::now_ms());
}

fn do_stop_emergency(ctx: &mut UrbaniteContext) {
    ctx.button.reset_duration();
    ctx.ultrasound.start();

    // A pause taken before the emergency still applies afterwards.
    if ctx.paused {
        ctx.display.set_enabled(false);
    }

    ctx.emergency = false;
    ctx.emergency_phase = false;
    info!("[{}] urbanite: EMERGENCY OFF", port::now_ms());
}

/// Alternate the indicator between 0 cm (all red) and 500 cm (dark) on a
/// wall-clock dwell. Runs on every fire while in emergency; phases change
/// only when the deadline passes, so the loop never blocks.
fn do_continue_emergency(ctx: &mut UrbaniteContext) {
    let now = port::now_ms();
    if now.wrapping_sub(ctx.next_phase_at_ms) >= u32::MAX / 2 {
        return; // deadline still ahead
    }

    if ctx.emergency_phase {
        ctx.display.set_distance(0);
    } else {
        ctx.display.set_distance(500);
    }
    ctx.emergency_phase = !ctx.emergency_phase;
    ctx.next_phase_at_ms = now.wrapping_add(ctx.emergency_flash_ms);
}

fn do_sleep(_ctx: &mut UrbaniteContext) {
    port::sleep();
}

// Ordering notes: the sleep rows precede the press rows, which is safe
// because a press in flight counts as activity until its release debounce
// ends. The final `check_off` row stays reachable below `check_emergency_on`
// because the two windows are disjoint (`off` caps below the emergency
// threshold).
static URBANITE_TRANSITIONS: [Transition<UrbaniteState, UrbaniteContext>; 13] = [
    Transition {
        from: UrbaniteState::Off,
        guard: check_no_activity,
        to: UrbaniteState::SleepWhileOff,
        action: Some(do_sleep),
    },
    Transition {
        from: UrbaniteState::SleepWhileOff,
        guard: check_activity,
        to: UrbaniteState::Off,
        action: None,
    },
    Transition {
        from: UrbaniteState::SleepWhileOff,
        guard: check_no_activity,
        to: UrbaniteState::SleepWhileOff,
        action: Some(do_sleep),
    },
    Transition {
        from: UrbaniteState::Off,
        guard: check_on,
        to: UrbaniteState::Measure,
        action: Some(do_start_up_measure),
    },
    Transition {
        from: UrbaniteState::Measure,
        guard: check_pause_display,
        to: UrbaniteState::Measure,
        action: Some(do_pause_display),
    },
    Transition {
        from: UrbaniteState::Measure,
        guard: check_new_measure,
        to: UrbaniteState::Measure,
        action: Some(do_display_distance),
    },
    Transition {
        from: UrbaniteState::Measure,
        guard: check_no_activity,
        to: UrbaniteState::SleepWhileOn,
        action: Some(do_sleep),
    },
    Transition {
        from: UrbaniteState::SleepWhileOn,
        guard: check_activity_in_measure,
        to: UrbaniteState::Measure,
        action: None,
    },
    Transition {
        from: UrbaniteState::SleepWhileOn,
        guard: check_no_activity,
        to: UrbaniteState::SleepWhileOn,
        action: Some(do_sleep),
    },
    Transition {
        from: UrbaniteState::Measure,
        guard: check_emergency_on,
        to: UrbaniteState::Emergency,
        action: Some(do_start_emergency),
    },
    Transition {
        from: UrbaniteState::Emergency,
        guard: check_emergency_off,
        to: UrbaniteState::Measure,
        action: Some(do_stop_emergency),
    },
    Transition {
        from: UrbaniteState::Emergency,
        guard: check_emergency_continue,
        to: UrbaniteState::Emergency,
        action: Some(do_continue_emergency),
    },
    Transition {
        from: UrbaniteState::Measure,
        guard: check_off,
        to: UrbaniteState::Off,
        action: Some(do_stop_urbanite),
    },
];

/// The master FSM. Owns the three leaves for the program lifetime.
pub struct Urbanite {
    fsm: Fsm<UrbaniteState, UrbaniteContext>,
    ctx: UrbaniteContext,
}

impl Urbanite {
    /// Assemble the master over its leaves with the configured press
    /// windows.
    pub fn new(
        button: ButtonFsm,
        ultrasound: UltrasoundFsm,
        display: DisplayFsm,
        config: &SystemConfig,
    ) -> Self {
        Self {
            fsm: Fsm::new(&URBANITE_TRANSITIONS, UrbaniteState::Off),
            ctx: UrbaniteContext {
                button,
                ultrasound,
                display,
                on_off_press_ms: config.on_off_press_ms,
                pause_display_ms: config.pause_display_ms,
                emergency_press_ms: config.emergency_press_ms,
                emergency_flash_ms: config.emergency_flash_ms,
                paused: false,
                emergency: false,
                emergency_phase: false,
                next_phase_at_ms: 0,
            },
        }
    }

    /// One main-loop iteration: fire every leaf, then the master table.
    pub fn fire(&mut self) {
        self.ctx.button.fire();
        self.ctx.ultrasound.fire();
        self.ctx.display.fire();
        self.fsm.fire(&mut self.ctx);
    }

    /// Current master state.
    pub fn state(&self) -> UrbaniteState {
        self.fsm.state()
    }

    /// Whether the display is paused.
    pub fn paused(&self) -> bool {
        self.ctx.paused
    }

    /// Whether the system is in emergency mode.
    pub fn emergency(&self) -> bool {
        self.ctx.emergency
    }

    /// The owned button FSM.
    pub fn button(&self) -> &ButtonFsm {
        &self.ctx.button
    }

    /// The owned ultrasound FSM.
    pub fn ultrasound(&self) -> &UltrasoundFsm {
        &self.ctx.ultrasound
    }

    /// The owned display FSM.
    pub fn display(&self) -> &DisplayFsm {
        &self.ctx.display
    }
}
