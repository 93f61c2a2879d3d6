//! Urbanite — entry point.
//!
//! Wires the configuration into the four state machines and runs the
//! control loop. Built for the host, the binary replays a scripted parking
//! manoeuvre through the simulated port layer so the whole system is
//! observable without a vehicle: arm with a long press, watch an obstacle
//! approach through the colour bands, pause, resume, and power off.

use anyhow::{Context, Result};
use log::info;

use urbanite::config::SystemConfig;
use urbanite::fsm::ultrasound::MEDIAN_WINDOW;
use urbanite::fsm::{ButtonFsm, DisplayFsm, UltrasoundFsm, Urbanite};
use urbanite::port;
use urbanite::port::button::PARKING_BUTTON_ID;
use urbanite::port::display::REAR_PARKING_DISPLAY_ID;
use urbanite::port::ultrasound::REAR_PARKING_SENSOR_ID;
use urbanite::port::{button as port_button, display as port_display, isr};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = SystemConfig::default();
    config.validate().context("press-window configuration")?;

    let button = ButtonFsm::new(config.button_debounce_ms, PARKING_BUTTON_ID)
        .context("parking button init")?;
    let ultrasound =
        UltrasoundFsm::new(REAR_PARKING_SENSOR_ID).context("rear parking sensor init")?;
    let display =
        DisplayFsm::new(REAR_PARKING_DISPLAY_ID).context("rear parking display init")?;

    let mut urbanite = Urbanite::new(button, ultrasound, display, &config);
    info!("urbanite ready (button {} ms debounce)", config.button_debounce_ms);

    // ── Scripted manoeuvre ────────────────────────────────────
    //
    // On the vehicle this loop is `loop { urbanite.fire() }` with the ISRs
    // wired to the vector table. Here the script plays the ISR side.

    press_button(&mut urbanite, 1_200); // arm
    info!("state after arming: {:?}", urbanite.state());

    // Obstacle approaching from 180 cm to 10 cm.
    for distance_cm in (10..=180).rev().step_by(10) {
        measure_window(&mut urbanite, distance_cm);
        urbanite.fire(); // master consumes the median
        urbanite.fire(); // display renders it
        let rgb = port_display::current_rgb(REAR_PARKING_DISPLAY_ID);
        info!(
            "obstacle at {:>3} cm -> rgb({:>3},{:>3},{:>3})",
            distance_cm, rgb.r, rgb.g, rgb.b
        );
    }

    press_button(&mut urbanite, 300); // pause at the kerb
    measure_window(&mut urbanite, 60);
    urbanite.fire();
    info!("paused: display enabled = {}", urbanite.display().enabled());

    measure_window(&mut urbanite, 10); // someone walks behind the car
    urbanite.fire();
    info!(
        "collision alert while paused: display enabled = {}",
        urbanite.display().enabled()
    );

    press_button(&mut urbanite, 1_500); // power off
    urbanite.fire();
    info!("state after power-off: {:?}", urbanite.state());

    Ok(())
}

/// Simulate a full button press of `hold_ms`, driving the EXTI and firing
/// the system through both debounce windows.
fn press_button(urbanite: &mut Urbanite, hold_ms: u32) {
    let debounce = urbanite.button().debounce_ms();
    port::set_millis(port::now_ms().wrapping_add(debounce));
    urbanite.fire();

    let t0 = port::now_ms();
    port_button::sim_set_line(PARKING_BUTTON_ID, false);
    isr::button_exti_handler(PARKING_BUTTON_ID);
    urbanite.fire();

    port::set_millis(t0.wrapping_add(debounce));
    urbanite.fire();

    // A median arriving mid-hold wakes the master if it was sleeping.
    measure_window(urbanite, 120);

    port::set_millis(t0.wrapping_add(hold_ms));
    port_button::sim_set_line(PARKING_BUTTON_ID, true);
    isr::button_exti_handler(PARKING_BUTTON_ID);
    urbanite.fire();
    urbanite.fire();
}

/// Replay the timer/capture ISR sequence for one full median window of
/// echoes at `distance_cm`.
fn measure_window(urbanite: &mut Urbanite, distance_cm: u32) {
    if !urbanite.ultrasound().enabled() {
        return;
    }
    for _ in 0..MEDIAN_WINDOW {
        isr::cycle_timer_handler(REAR_PARKING_SENSOR_ID);
        urbanite.fire();
        isr::trigger_timer_handler(REAR_PARKING_SENSOR_ID);
        urbanite.fire();
        isr::echo_capture_handler(REAR_PARKING_SENSOR_ID, 1_000);
        urbanite.fire();
        let echo_ticks = distance_cm * 583 / 10 + 3;
        isr::echo_capture_handler(REAR_PARKING_SENSOR_ID, 1_000 + echo_ticks);
        urbanite.fire();
    }
}
