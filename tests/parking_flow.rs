//! End-to-end parking scenarios.
//!
//! Each test boots the full controller — master plus the three leaves —
//! and drives it purely through the simulated port layer: EXTI edges for
//! the button, timer/capture handlers for the ultrasound. Nothing below
//! the port boundary is faked.
//!
//! The port mirrors are process-wide singletons, so the scenarios
//! serialise on a test lock.

use std::sync::{Mutex, MutexGuard, OnceLock};

use urbanite::config::SystemConfig;
use urbanite::fsm::ultrasound::MEDIAN_WINDOW;
use urbanite::fsm::{ButtonFsm, DisplayFsm, UltrasoundFsm, Urbanite, UrbaniteState};
use urbanite::port;
use urbanite::port::button::PARKING_BUTTON_ID;
use urbanite::port::display::REAR_PARKING_DISPLAY_ID;
use urbanite::port::ultrasound::REAR_PARKING_SENSOR_ID;
use urbanite::port::{button as port_button, display as port_display, isr};

fn scenario_lock() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn boot() -> Urbanite {
    port::set_millis(0);
    let config = SystemConfig::default();
    let button = ButtonFsm::new(config.button_debounce_ms, PARKING_BUTTON_ID).unwrap();
    let ultrasound = UltrasoundFsm::new(REAR_PARKING_SENSOR_ID).unwrap();
    let display = DisplayFsm::new(REAR_PARKING_DISPLAY_ID).unwrap();
    Urbanite::new(button, ultrasound, display, &config)
}

/// Simulate a full press of `hold_ms`: EXTI edge in, debounce, release,
/// and two master fires inside the release-debounce window where press
/// classification happens.
fn press(urb: &mut Urbanite, hold_ms: u32) {
    let debounce = urb.button().debounce_ms();
    port::set_millis(port::now_ms().wrapping_add(debounce));
    urb.fire();

    let t0 = port::now_ms();
    port_button::sim_set_line(PARKING_BUTTON_ID, false);
    isr::button_exti_handler(PARKING_BUTTON_ID);
    urb.fire();

    port::set_millis(t0.wrapping_add(debounce));
    urb.fire();

    port::set_millis(t0.wrapping_add(hold_ms));
    port_button::sim_set_line(PARKING_BUTTON_ID, true);
    isr::button_exti_handler(PARKING_BUTTON_ID);
    urb.fire();
    urb.fire();
}

/// Like [`press`], with a full echo window arriving mid-hold so a sleeping
/// master wakes into `Measure` in time to classify the release.
fn press_with_traffic(urb: &mut Urbanite, hold_ms: u32, cm: u32) {
    let debounce = urb.button().debounce_ms();
    port::set_millis(port::now_ms().wrapping_add(debounce));
    urb.fire();

    let t0 = port::now_ms();
    port_button::sim_set_line(PARKING_BUTTON_ID, false);
    isr::button_exti_handler(PARKING_BUTTON_ID);
    urb.fire();

    port::set_millis(t0.wrapping_add(debounce));
    urb.fire();

    echo_window(urb, cm);

    port::set_millis(t0.wrapping_add(hold_ms));
    port_button::sim_set_line(PARKING_BUTTON_ID, true);
    isr::button_exti_handler(PARKING_BUTTON_ID);
    urb.fire();
    urb.fire();
}

/// Replay one echo at `cm` through the timer/capture ISRs.
fn echo(urb: &mut Urbanite, cm: u32) {
    isr::cycle_timer_handler(REAR_PARKING_SENSOR_ID);
    urb.fire();
    isr::trigger_timer_handler(REAR_PARKING_SENSOR_ID);
    urb.fire();
    isr::echo_capture_handler(REAR_PARKING_SENSOR_ID, 1_000);
    urb.fire();
    isr::echo_capture_handler(REAR_PARKING_SENSOR_ID, 1_000 + cm * 583 / 10 + 3);
    urb.fire();
}

/// A full median window of identical echoes.
fn echo_window(urb: &mut Urbanite, cm: u32) {
    for _ in 0..MEDIAN_WINDOW {
        echo(urb, cm);
    }
}

fn displayed_rgb() -> port_display::RgbColor {
    port_display::current_rgb(REAR_PARKING_DISPLAY_ID)
}

// ── Scenarios ─────────────────────────────────────────────────

#[test]
fn cold_start_then_arm() {
    let _guard = scenario_lock();
    let mut urb = boot();
    assert_eq!(urb.state(), UrbaniteState::Off);

    press(&mut urb, 1_200);
    assert_eq!(urb.state(), UrbaniteState::Measure);
    assert!(urb.ultrasound().enabled());
    assert!(urb.display().enabled());
}

#[test]
fn seventeen_centimetres_renders_red_into_yellow() {
    let _guard = scenario_lock();
    let mut urb = boot();
    press(&mut urb, 1_200);

    // init=100, end=1092: 992 µs of echo, 17 cm at 58.3 µs/cm.
    for _ in 0..MEDIAN_WINDOW {
        isr::cycle_timer_handler(REAR_PARKING_SENSOR_ID);
        urb.fire();
        isr::trigger_timer_handler(REAR_PARKING_SENSOR_ID);
        urb.fire();
        isr::echo_capture_handler(REAR_PARKING_SENSOR_ID, 100);
        urb.fire();
        isr::echo_capture_handler(REAR_PARKING_SENSOR_ID, 1_092);
        urb.fire();
    }
    urb.fire(); // display renders the median

    // t = 17 * 255 / 25 = 173 between pure red and pure yellow.
    let rgb = displayed_rgb();
    assert_eq!(rgb.r, 255);
    assert_eq!(rgb.g, 173);
    assert_eq!(rgb.b, 0);
}

#[test]
fn pause_silences_display_until_toggled_back() {
    let _guard = scenario_lock();
    let mut urb = boot();
    press(&mut urb, 1_200);
    echo_window(&mut urb, 60);
    urb.fire(); // render once so there is a "last sample"

    // The master sleeps between medians; the short press classifies as
    // soon as the next median wakes it.
    press(&mut urb, 300);
    echo_window(&mut urb, 60);
    urb.fire();
    assert!(urb.paused());
    assert!(!urb.display().enabled());
    urb.fire();
    assert_eq!(displayed_rgb(), port_display::COLOR_OFF);

    // Second toggle: the master is asleep, so the pending classification
    // is honoured when the next median wakes it.
    press(&mut urb, 300);
    echo_window(&mut urb, 60);
    urb.fire();
    assert!(!urb.paused());
    assert!(urb.display().enabled());

    // The resumed display re-renders on the next sample.
    echo_window(&mut urb, 60);
    urb.fire();
    urb.fire();
    assert_ne!(displayed_rgb(), port_display::COLOR_OFF);
}

#[test]
fn median_rejects_the_outlier() {
    let _guard = scenario_lock();
    let mut urb = boot();
    press(&mut urb, 1_200);

    for cm in [30, 28, 200, 29, 31] {
        echo(&mut urb, cm);
    }
    urb.fire(); // display renders the median

    // Median of the window is 30 cm: yellow→green band.
    assert_eq!(
        displayed_rgb(),
        urbanite::fsm::display::colour_for_distance(30)
    );
}

#[test]
fn emergency_in_and_out() {
    let _guard = scenario_lock();
    let mut urb = boot();
    press(&mut urb, 1_200);
    echo_window(&mut urb, 90);
    urb.fire();

    press_with_traffic(&mut urb, 3_200, 90);
    assert_eq!(urb.state(), UrbaniteState::Emergency);
    assert!(!urb.ultrasound().enabled());

    // Danger phase renders 0 cm (solid red) immediately.
    urb.fire();
    urb.fire();
    assert_eq!(displayed_rgb(), port_display::COLOR_RED);

    // One second later the dark phase takes over…
    port::set_millis(port::now_ms().wrapping_add(1_000));
    urb.fire();
    urb.fire();
    assert_eq!(displayed_rgb(), port_display::COLOR_OFF);

    // …and alternates back.
    port::set_millis(port::now_ms().wrapping_add(1_000));
    urb.fire();
    urb.fire();
    assert_eq!(displayed_rgb(), port_display::COLOR_RED);

    press(&mut urb, 3_200);
    assert_eq!(urb.state(), UrbaniteState::Measure);
    assert!(urb.ultrasound().enabled());
}

#[test]
fn power_off_from_measure() {
    let _guard = scenario_lock();
    let mut urb = boot();
    press(&mut urb, 1_200);
    echo_window(&mut urb, 70);
    urb.fire();

    press_with_traffic(&mut urb, 1_500, 70);
    assert_eq!(urb.state(), UrbaniteState::Off);
    urb.fire(); // leaves observe the disable
    assert!(!urb.ultrasound().enabled());
    assert!(!urb.display().enabled());
    assert_eq!(displayed_rgb(), port_display::COLOR_OFF);
}

#[test]
fn sleeping_controller_keeps_waking_for_each_median() {
    let _guard = scenario_lock();
    let mut urb = boot();
    press(&mut urb, 1_200);
    echo_window(&mut urb, 100);
    urb.fire(); // render; display idle

    port::set_millis(port::now_ms().wrapping_add(urb.button().debounce_ms()));
    urb.fire();
    assert_eq!(urb.state(), UrbaniteState::SleepWhileOn);
    let sleeps = port::sleep_count();

    echo_window(&mut urb, 90);
    assert_eq!(urb.state(), UrbaniteState::Measure, "median wakes the master");
    assert!(port::sleep_count() > sleeps, "it slept between medians");
}
