//! Interrupt service routines — the mirror-side writers.
//!
//! Each handler body is exactly what runs on the target when the
//! corresponding vector fires; the board layer wires them to the vector
//! table, and the host test suite and demo binary call them directly to
//! replay hardware event sequences.
//!
//! Handlers that can wake the CPU from sleep (button EXTI, echo capture)
//! resume the system tick on entry so wall-clock reads stay accurate.

use crate::port;
use crate::port::{button, ultrasound};

/// SysTick: advance the millisecond counter by one.
pub fn systick_handler() {
    port::set_millis(port::now_ms().wrapping_add(1));
}

/// Button EXTI: latch the press state from the current line level and clear
/// the pending bit. Fires on both edges; the active-low line makes
/// `pressed = !line`.
pub fn button_exti_handler(button_id: u32) {
    port::systick_resume();

    if button::interrupt_pending(button_id) {
        let value = button::value(button_id);
        button::set_pressed(button_id, !value);
        button::clear_pending_interrupt(button_id);
    }
}

/// Trigger-timer update: the 10 µs pulse window elapsed.
pub fn trigger_timer_handler(ultrasound_id: u32) {
    ultrasound::set_trigger_end(ultrasound_id, true);
}

/// Echo-timer input capture: first edge records the rising tick, second
/// edge records the falling tick and sets `echo_received` last, closing
/// the capture protocol.
pub fn echo_capture_handler(ultrasound_id: u32, captured_tick: u32) {
    port::systick_resume();

    let init_tick = ultrasound::echo_init_tick(ultrasound_id);
    let end_tick = ultrasound::echo_end_tick(ultrasound_id);

    if init_tick == 0 && end_tick == 0 {
        ultrasound::set_echo_init_tick(ultrasound_id, captured_tick);
    } else {
        ultrasound::set_echo_end_tick(ultrasound_id, captured_tick);
        ultrasound::set_echo_received(ultrasound_id, true);
    }
}

/// Echo-timer update event: the 16-bit counter wrapped mid-echo.
/// Runs on the same vector as the capture handler, so the overflow count
/// seen together with `echo_received` is the one for that capture window.
pub fn echo_overflow_handler(ultrasound_id: u32) {
    port::systick_resume();

    let overflows = ultrasound::echo_overflows(ultrasound_id);
    ultrasound::set_echo_overflows(ultrasound_id, overflows + 1);
}

/// Cycle-timer update: the 100 ms measurement period elapsed, a new
/// measurement may start.
pub fn cycle_timer_handler(ultrasound_id: u32) {
    ultrasound::set_trigger_ready(ultrasound_id, true);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::ultrasound::REAR_PARKING_SENSOR_ID as SENSOR;

    #[test]
    fn capture_protocol_orders_init_end_received() {
        let _guard = port::test_lock();
        ultrasound::init(SENSOR).unwrap();

        assert!(!ultrasound::echo_received(SENSOR));
        echo_capture_handler(SENSOR, 100);
        assert_eq!(ultrasound::echo_init_tick(SENSOR), 100);
        assert!(!ultrasound::echo_received(SENSOR));

        echo_capture_handler(SENSOR, 1091);
        assert_eq!(ultrasound::echo_end_tick(SENSOR), 1091);
        assert!(ultrasound::echo_received(SENSOR));
    }

    #[test]
    fn overflow_counts_accumulate_until_reset() {
        let _guard = port::test_lock();
        ultrasound::init(SENSOR).unwrap();

        echo_overflow_handler(SENSOR);
        echo_overflow_handler(SENSOR);
        assert_eq!(ultrasound::echo_overflows(SENSOR), 2);

        ultrasound::reset_echo_ticks(SENSOR);
        assert_eq!(ultrasound::echo_overflows(SENSOR), 0);
    }

    #[test]
    fn wake_capable_isrs_resume_the_tick() {
        let _guard = port::test_lock();
        ultrasound::init(SENSOR).unwrap();
        button::init(button::PARKING_BUTTON_ID).unwrap();

        port::sleep();
        assert!(!port::systick_running());
        echo_capture_handler(SENSOR, 5);
        assert!(port::systick_running());

        port::sleep();
        button_exti_handler(button::PARKING_BUTTON_ID);
        assert!(port::systick_running());
    }
}
