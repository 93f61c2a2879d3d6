//! Parking-button hardware mirror.
//!
//! One record per physical button, indexed by id. The EXTI ISR is the only
//! writer of the `pressed` latch; the button FSM consumes it and reads the
//! raw line level to track the release.
//!
//! ## Hardware
//!
//! Active-low momentary switch: the line idles high and is pulled low while
//! the button is held. The EXTI fires on both edges and latches
//! `pressed = !line`.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Result};

/// Id of the single parking button on the rear board.
pub const PARKING_BUTTON_ID: u32 = 0;

/// Mirror record for one button.
struct ButtonMirror {
    /// Raw line level (true = high = released for the active-low switch).
    line_high: AtomicBool,
    /// Press latch maintained by the EXTI ISR, consumed by the FSM.
    pressed: AtomicBool,
    /// Pending bit of the EXTI line.
    irq_pending: AtomicBool,
    /// Whether the EXTI line is enabled.
    irq_enabled: AtomicBool,
}

impl ButtonMirror {
    const fn new() -> Self {
        Self {
            line_high: AtomicBool::new(true),
            pressed: AtomicBool::new(false),
            irq_pending: AtomicBool::new(false),
            irq_enabled: AtomicBool::new(true),
        }
    }
}

static BUTTONS: [ButtonMirror; 1] = [ButtonMirror::new()];

fn mirror(button_id: u32) -> &'static ButtonMirror {
    // Ids are validated by init(); an out-of-range id past that point is a
    // programming error.
    &BUTTONS[button_id as usize]
}

/// Configure the mirror for the given button and reset it to the idle state.
pub fn init(button_id: u32) -> Result<()> {
    if button_id as usize >= BUTTONS.len() {
        return Err(Error::InvalidPeripheralId {
            peripheral: "button",
            id: button_id,
        });
    }
    let b = mirror(button_id);
    b.line_high.store(true, Ordering::Relaxed);
    b.pressed.store(false, Ordering::Relaxed);
    b.irq_pending.store(false, Ordering::Relaxed);
    b.irq_enabled.store(true, Ordering::Relaxed);
    Ok(())
}

/// The ISR-maintained press latch.
pub fn pressed(button_id: u32) -> bool {
    mirror(button_id).pressed.load(Ordering::Acquire)
}

/// Overwrite the press latch. Called by the EXTI ISR on each edge and by
/// the FSM to consume an edge it has acted on.
pub fn set_pressed(button_id: u32, pressed: bool) {
    mirror(button_id).pressed.store(pressed, Ordering::Release);
}

/// Raw line level (true = high = released).
pub fn value(button_id: u32) -> bool {
    mirror(button_id).line_high.load(Ordering::Relaxed)
}

/// Whether the EXTI line has a pending interrupt.
pub fn interrupt_pending(button_id: u32) -> bool {
    mirror(button_id).irq_pending.load(Ordering::Relaxed)
}

/// Clear the EXTI pending bit.
pub fn clear_pending_interrupt(button_id: u32) {
    mirror(button_id).irq_pending.store(false, Ordering::Relaxed);
}

/// Mask the EXTI line.
pub fn disable_interrupts(button_id: u32) {
    mirror(button_id).irq_enabled.store(false, Ordering::Relaxed);
}

// ── Simulation hooks ──────────────────────────────────────────
//
// On the target the line level comes from the GPIO input register and the
// pending bit from EXTI->PR. The host drives both directly; tests and the
// demo binary change the line and then deliver the EXTI.

/// Set the raw line level and raise the EXTI pending bit, as a real edge
/// would. Follow with [`crate::port::isr::button_exti_handler`].
pub fn sim_set_line(button_id: u32, high: bool) {
    let b = mirror(button_id);
    b.line_high.store(high, Ordering::Relaxed);
    if b.irq_enabled.load(Ordering::Relaxed) {
        b.irq_pending.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port;

    #[test]
    fn init_rejects_unknown_id() {
        assert_eq!(
            init(9),
            Err(Error::InvalidPeripheralId {
                peripheral: "button",
                id: 9
            })
        );
    }

    #[test]
    fn edge_latches_pressed_until_consumed() {
        let _guard = port::test_lock();
        init(PARKING_BUTTON_ID).unwrap();

        sim_set_line(PARKING_BUTTON_ID, false);
        port::isr::button_exti_handler(PARKING_BUTTON_ID);
        assert!(pressed(PARKING_BUTTON_ID));
        assert!(!interrupt_pending(PARKING_BUTTON_ID));

        // FSM consumes the edge; the latch stays clear while held.
        set_pressed(PARKING_BUTTON_ID, false);
        assert!(!pressed(PARKING_BUTTON_ID));
        assert!(!value(PARKING_BUTTON_ID), "line still low while held");
    }

    #[test]
    fn masked_line_does_not_pend() {
        let _guard = port::test_lock();
        init(PARKING_BUTTON_ID).unwrap();
        disable_interrupts(PARKING_BUTTON_ID);
        sim_set_line(PARKING_BUTTON_ID, false);
        assert!(!interrupt_pending(PARKING_BUTTON_ID));
    }
}
