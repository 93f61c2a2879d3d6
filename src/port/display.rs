//! RGB indicator hardware mirror.
//!
//! The display FSM hands this port an 8-bit colour triple; the port maps
//! each channel onto a PWM compare value with `CCRx = channel * ARR / 255`.
//! A zero channel switches its PWM output off entirely rather than driving
//! a 0% duty.
//!
//! On the target the three channels live on one 4-channel PWM timer; on the
//! host the computed compare values and channel-enable bits are the
//! observable.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::error::{Error, Result};

/// Id of the rear parking display.
pub const REAR_PARKING_DISPLAY_ID: u32 = 0;
/// Auto-reload value of the PWM timer driving the RGB channels.
pub const PWM_ARR: u32 = 63_999;
/// Full-scale channel value.
pub const RGB_MAX_VALUE: u32 = 255;

/// An 8-bit RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Indicator colours of the distance gradient.
pub const COLOR_RED: RgbColor = RgbColor::new(255, 0, 0);
pub const COLOR_YELLOW: RgbColor = RgbColor::new(255, 255, 0);
pub const COLOR_GREEN: RgbColor = RgbColor::new(0, 255, 0);
pub const COLOR_TURQUOISE: RgbColor = RgbColor::new(64, 224, 208);
pub const COLOR_BLUE: RgbColor = RgbColor::new(0, 0, 255);
pub const COLOR_OFF: RgbColor = RgbColor::new(0, 0, 0);

/// Mirror record for one RGB display.
struct DisplayMirror {
    /// Last commanded colour, packed 0x00RRGGBB.
    rgb: AtomicU32,
    /// PWM compare values per channel.
    ccr_r: AtomicU32,
    ccr_g: AtomicU32,
    ccr_b: AtomicU32,
    /// Whether the PWM timer is running (off when all channels are zero).
    timer_on: AtomicBool,
}

impl DisplayMirror {
    const fn new() -> Self {
        Self {
            rgb: AtomicU32::new(0),
            ccr_r: AtomicU32::new(0),
            ccr_g: AtomicU32::new(0),
            ccr_b: AtomicU32::new(0),
            timer_on: AtomicBool::new(false),
        }
    }
}

static DISPLAYS: [DisplayMirror; 1] = [DisplayMirror::new()];

fn mirror(display_id: u32) -> &'static DisplayMirror {
    // Ids are validated by init(); see port module docs.
    &DISPLAYS[display_id as usize]
}

/// Configure the mirror for the given display and switch it off.
pub fn init(display_id: u32) -> Result<()> {
    if display_id as usize >= DISPLAYS.len() {
        return Err(Error::InvalidPeripheralId {
            peripheral: "display",
            id: display_id,
        });
    }
    set_rgb(display_id, COLOR_OFF);
    Ok(())
}

/// Drive the RGB indicator. Zero channels are switched off (compare value
/// 0 with the output disabled); non-zero channels get a duty proportional
/// to `channel / 255`.
pub fn set_rgb(display_id: u32, color: RgbColor) {
    let d = mirror(display_id);
    let packed = ((color.r as u32) << 16) | ((color.g as u32) << 8) | color.b as u32;
    d.rgb.store(packed, Ordering::Relaxed);

    d.ccr_r.store(channel_to_ccr(color.r), Ordering::Relaxed);
    d.ccr_g.store(channel_to_ccr(color.g), Ordering::Relaxed);
    d.ccr_b.store(channel_to_ccr(color.b), Ordering::Relaxed);

    let any_on = color.r != 0 || color.g != 0 || color.b != 0;
    d.timer_on.store(any_on, Ordering::Relaxed);
}

/// Last commanded colour (host observable).
pub fn current_rgb(display_id: u32) -> RgbColor {
    let packed = mirror(display_id).rgb.load(Ordering::Relaxed);
    RgbColor::new((packed >> 16) as u8, (packed >> 8) as u8, packed as u8)
}

/// PWM compare values per channel (host observable).
pub fn current_ccr(display_id: u32) -> (u32, u32, u32) {
    let d = mirror(display_id);
    (
        d.ccr_r.load(Ordering::Relaxed),
        d.ccr_g.load(Ordering::Relaxed),
        d.ccr_b.load(Ordering::Relaxed),
    )
}

/// Whether the PWM timer is running (host observable).
pub fn pwm_running(display_id: u32) -> bool {
    mirror(display_id).timer_on.load(Ordering::Relaxed)
}

fn channel_to_ccr(channel: u8) -> u32 {
    channel as u32 * PWM_ARR / RGB_MAX_VALUE
}
