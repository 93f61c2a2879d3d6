//! Ultrasonic transceiver hardware mirror.
//!
//! Three timers cooperate per measurement cycle:
//!
//! | Timer   | Role                                   | Period  |
//! |---------|----------------------------------------|---------|
//! | trigger | one-shot, ends the 10 µs trigger pulse | 10 µs   |
//! | echo    | free-running 1 MHz input capture       | 65536 µs wrap |
//! | cycle   | restarts the measurement               | 100 ms  |
//!
//! The capture protocol is ordered: `echo_init_tick` is written on the
//! rising edge, `echo_end_tick` on the falling edge, and `echo_received`
//! last — it is the single flag the measurement FSM waits on, so a reader
//! that observes it set also observes both ticks and the overflow count
//! that belong to that capture window.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::error::{Error, Result};

/// Id of the rear parking sensor.
pub const REAR_PARKING_SENSOR_ID: u32 = 0;
/// Duration of the trigger pulse in microseconds.
pub const TRIGGER_UP_US: u32 = 10;
/// Measurement cycle period in milliseconds. The cycle timer always fires,
/// which is what unsticks a measurement whose echo never arrived.
pub const MEASUREMENT_PERIOD_MS: u32 = 100;
/// Echo capture timer resolution: 1 tick = 1 µs.
pub const ECHO_TICK_US: u32 = 1;

/// Mirror record for one transceiver.
struct UltrasoundMirror {
    /// The cycle timer elapsed: a new measurement may start.
    trigger_ready: AtomicBool,
    /// The trigger timer elapsed: the 10 µs pulse must be lowered.
    trigger_end: AtomicBool,
    /// Level of the trigger output line.
    trigger_high: AtomicBool,
    /// Capture tick of the echo rising edge (0 = not yet captured).
    echo_init_tick: AtomicU32,
    /// Capture tick of the echo falling edge.
    echo_end_tick: AtomicU32,
    /// Echo-timer wraparounds between the two edges.
    echo_overflows: AtomicU32,
    /// Both edges captured; closes the multi-word capture protocol.
    echo_received: AtomicBool,
    /// Run state of the one-shot trigger timer.
    trigger_timer_on: AtomicBool,
    /// Run state of the echo capture timer.
    echo_timer_on: AtomicBool,
}

impl UltrasoundMirror {
    const fn new() -> Self {
        Self {
            trigger_ready: AtomicBool::new(true),
            trigger_end: AtomicBool::new(false),
            trigger_high: AtomicBool::new(false),
            echo_init_tick: AtomicU32::new(0),
            echo_end_tick: AtomicU32::new(0),
            echo_overflows: AtomicU32::new(0),
            echo_received: AtomicBool::new(false),
            trigger_timer_on: AtomicBool::new(false),
            echo_timer_on: AtomicBool::new(false),
        }
    }
}

static ULTRASOUNDS: [UltrasoundMirror; 1] = [UltrasoundMirror::new()];

/// Run state of the shared measurement-cycle timer.
static CYCLE_TIMER_ON: AtomicBool = AtomicBool::new(false);

fn mirror(ultrasound_id: u32) -> &'static UltrasoundMirror {
    // Ids are validated by init(); see port module docs.
    &ULTRASOUNDS[ultrasound_id as usize]
}

/// Configure the mirror for the given transceiver and reset it to idle.
pub fn init(ultrasound_id: u32) -> Result<()> {
    if ultrasound_id as usize >= ULTRASOUNDS.len() {
        return Err(Error::InvalidPeripheralId {
            peripheral: "ultrasound",
            id: ultrasound_id,
        });
    }
    let u = mirror(ultrasound_id);
    u.trigger_ready.store(true, Ordering::Relaxed);
    u.trigger_end.store(false, Ordering::Relaxed);
    u.trigger_high.store(false, Ordering::Relaxed);
    u.trigger_timer_on.store(false, Ordering::Relaxed);
    u.echo_timer_on.store(false, Ordering::Relaxed);
    CYCLE_TIMER_ON.store(false, Ordering::Relaxed);
    reset_echo_ticks(ultrasound_id);
    Ok(())
}

// ── Measurement control ───────────────────────────────────────

/// Start one measurement: raise the trigger line, arm the trigger and echo
/// timers from zero, and restart the cycle timer.
pub fn start_measurement(ultrasound_id: u32) {
    let u = mirror(ultrasound_id);
    u.trigger_ready.store(false, Ordering::Relaxed);
    u.trigger_high.store(true, Ordering::Relaxed);
    u.trigger_timer_on.store(true, Ordering::Relaxed);
    u.echo_timer_on.store(true, Ordering::Relaxed);
    CYCLE_TIMER_ON.store(true, Ordering::Relaxed);
}

/// Enable the measurement-cycle timer.
pub fn start_new_measurement_timer() {
    CYCLE_TIMER_ON.store(true, Ordering::Relaxed);
}

/// Halt the measurement-cycle timer.
pub fn stop_new_measurement_timer() {
    CYCLE_TIMER_ON.store(false, Ordering::Relaxed);
}

/// Lower the trigger line and halt the one-shot trigger timer.
pub fn stop_trigger_timer(ultrasound_id: u32) {
    let u = mirror(ultrasound_id);
    u.trigger_high.store(false, Ordering::Relaxed);
    u.trigger_timer_on.store(false, Ordering::Relaxed);
}

/// Halt the echo capture timer.
pub fn stop_echo_timer(ultrasound_id: u32) {
    mirror(ultrasound_id)
        .echo_timer_on
        .store(false, Ordering::Relaxed);
}

/// Halt every timer of the transceiver and clear the capture state.
pub fn stop_ultrasound(ultrasound_id: u32) {
    stop_trigger_timer(ultrasound_id);
    stop_echo_timer(ultrasound_id);
    stop_new_measurement_timer();
    reset_echo_ticks(ultrasound_id);
}

/// Clear the echo capture protocol once a distance has been taken (or a
/// cycle abandoned).
pub fn reset_echo_ticks(ultrasound_id: u32) {
    let u = mirror(ultrasound_id);
    u.echo_received.store(false, Ordering::Relaxed);
    u.echo_init_tick.store(0, Ordering::Relaxed);
    u.echo_end_tick.store(0, Ordering::Relaxed);
    u.echo_overflows.store(0, Ordering::Relaxed);
}

// ── Mirror accessors ──────────────────────────────────────────

pub fn trigger_ready(ultrasound_id: u32) -> bool {
    mirror(ultrasound_id).trigger_ready.load(Ordering::Acquire)
}

pub fn set_trigger_ready(ultrasound_id: u32, ready: bool) {
    mirror(ultrasound_id)
        .trigger_ready
        .store(ready, Ordering::Release);
}

pub fn trigger_end(ultrasound_id: u32) -> bool {
    mirror(ultrasound_id).trigger_end.load(Ordering::Acquire)
}

pub fn set_trigger_end(ultrasound_id: u32, end: bool) {
    mirror(ultrasound_id)
        .trigger_end
        .store(end, Ordering::Release);
}

/// Level of the trigger output line (host observable).
pub fn trigger_high(ultrasound_id: u32) -> bool {
    mirror(ultrasound_id).trigger_high.load(Ordering::Relaxed)
}

pub fn echo_init_tick(ultrasound_id: u32) -> u32 {
    mirror(ultrasound_id).echo_init_tick.load(Ordering::Acquire)
}

pub fn set_echo_init_tick(ultrasound_id: u32, tick: u32) {
    mirror(ultrasound_id)
        .echo_init_tick
        .store(tick, Ordering::Release);
}

pub fn echo_end_tick(ultrasound_id: u32) -> u32 {
    mirror(ultrasound_id).echo_end_tick.load(Ordering::Acquire)
}

pub fn set_echo_end_tick(ultrasound_id: u32, tick: u32) {
    mirror(ultrasound_id)
        .echo_end_tick
        .store(tick, Ordering::Release);
}

pub fn echo_overflows(ultrasound_id: u32) -> u32 {
    mirror(ultrasound_id).echo_overflows.load(Ordering::Acquire)
}

pub fn set_echo_overflows(ultrasound_id: u32, overflows: u32) {
    mirror(ultrasound_id)
        .echo_overflows
        .store(overflows, Ordering::Release);
}

pub fn echo_received(ultrasound_id: u32) -> bool {
    mirror(ultrasound_id).echo_received.load(Ordering::Acquire)
}

pub fn set_echo_received(ultrasound_id: u32, received: bool) {
    mirror(ultrasound_id)
        .echo_received
        .store(received, Ordering::Release);
}

/// Run state of the echo timer (host observable).
pub fn echo_timer_running(ultrasound_id: u32) -> bool {
    mirror(ultrasound_id).echo_timer_on.load(Ordering::Relaxed)
}

/// Run state of the cycle timer (host observable).
pub fn cycle_timer_running() -> bool {
    CYCLE_TIMER_ON.load(Ordering::Relaxed)
}
