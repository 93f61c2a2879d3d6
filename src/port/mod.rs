//! Hardware port layer.
//!
//! The FSMs never touch registers; they talk to per-peripheral **mirror
//! records** held in this module tree. The discipline is strict
//! single-writer:
//!
//! ```text
//! ┌──────────────┐  set_*()   ┌───────────────┐  get_*()   ┌────────────┐
//! │ ISRs         │───────────▶│ mirror record │───────────▶│ main loop  │
//! │ (port::isr)  │            │ (atomics)     │            │ (FSM fire) │
//! └──────────────┘            └───────────────┘            └────────────┘
//! ```
//!
//! Every mirror field is a word-sized atomic, so individual reads are
//! tear-free. Multi-word protocols (echo init/end ticks) are closed by a
//! single flag written last with `Release` and read with `Acquire`.
//!
//! On the target the register writes hang off these records behind the
//! board layer; on the host the records themselves are the observable, which
//! is what the test suite and the demo binary drive.

pub mod button;
pub mod display;
pub mod isr;
pub mod ultrasound;

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

// ── System tick ───────────────────────────────────────────────

/// Monotonic millisecond counter. Written by the SysTick ISR, read
/// everywhere. Wraps at 2^32.
static MILLIS: AtomicU32 = AtomicU32::new(0);

/// Whether the system tick is currently running. Suspended before sleep,
/// resumed by any wake-capable ISR on entry.
static SYSTICK_RUNNING: AtomicBool = AtomicBool::new(true);

/// Number of times the CPU has been put to sleep. Host-side observable for
/// the low-power behaviour; free-running on the target too.
static SLEEP_COUNT: AtomicU32 = AtomicU32::new(0);

/// Current monotonic time in milliseconds.
pub fn now_ms() -> u32 {
    MILLIS.load(Ordering::Relaxed)
}

/// Overwrite the millisecond counter. Called by the SysTick ISR (and by the
/// host simulation to advance time).
pub fn set_millis(ms: u32) {
    MILLIS.store(ms, Ordering::Relaxed);
}

/// Suspend the tick and wait for an interrupt.
///
/// On the target this is `WFI` with SysTick suspended; execution resumes on
/// any enabled interrupt, whose handler re-enables the tick via
/// [`systick_resume`]. On the host the sleep is recorded and control
/// returns immediately so the loop stays drivable.
pub fn sleep() {
    SYSTICK_RUNNING.store(false, Ordering::Relaxed);
    SLEEP_COUNT.fetch_add(1, Ordering::Relaxed);
    std::thread::yield_now();
}

/// Re-enable the system tick. ISRs that need accurate wall-clock (button
/// EXTI, echo capture) call this defensively on entry in case the CPU was
/// sleeping when they fired.
pub fn systick_resume() {
    SYSTICK_RUNNING.store(true, Ordering::Relaxed);
}

/// Whether the system tick is running (false only between a sleep entry and
/// the next wake-capable interrupt).
pub fn systick_running() -> bool {
    SYSTICK_RUNNING.load(Ordering::Relaxed)
}

/// How many times [`sleep`] has been entered since boot.
pub fn sleep_count() -> u32 {
    SLEEP_COUNT.load(Ordering::Relaxed)
}

// ── Test support ──────────────────────────────────────────────

/// The mirror records are process-wide singletons, so unit tests that drive
/// them must not interleave. Each such test takes this lock first.
#[cfg(test)]
pub(crate) fn test_lock() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock};
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
