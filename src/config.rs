//! System configuration parameters.
//!
//! All tunable timing for the Urbanite parking aid. There are no config
//! files and no persisted state — [`SystemConfig::default()`] *is* the
//! product configuration. The serde derives keep the struct transportable
//! for bench-provisioning and telemetry tooling.

use serde::{Deserialize, Serialize};

/// Button press time in ms to turn the system ON or OFF (long press).
pub const ON_OFF_PRESS_TIME_MS: u32 = 1000;
/// Button press time in ms to pause or resume the display (short press).
pub const PAUSE_DISPLAY_TIME_MS: u32 = 250;
/// Button press time in ms to enter or leave emergency mode (very long press).
pub const EMERGENCY_PRESS_TIME_MS: u32 = 3000;
/// Anti-rebound window of the parking button in ms.
pub const BUTTON_DEBOUNCE_TIME_MS: u32 = 150;
/// Dwell of each emergency flash phase in ms.
pub const EMERGENCY_FLASH_PERIOD_MS: u32 = 1000;

/// Core system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Button ---
    /// Debounce window for the parking button (milliseconds).
    pub button_debounce_ms: u32,

    // --- Press classification thresholds ---
    /// Minimum press duration to toggle display pause (milliseconds).
    pub pause_display_ms: u32,
    /// Minimum press duration to power the system on or off (milliseconds).
    pub on_off_press_ms: u32,
    /// Minimum press duration to enter or leave emergency mode (milliseconds).
    pub emergency_press_ms: u32,

    // --- Emergency ---
    /// Dwell of each emergency flash phase (milliseconds).
    pub emergency_flash_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            button_debounce_ms: BUTTON_DEBOUNCE_TIME_MS,
            pause_display_ms: PAUSE_DISPLAY_TIME_MS,
            on_off_press_ms: ON_OFF_PRESS_TIME_MS,
            emergency_press_ms: EMERGENCY_PRESS_TIME_MS,
            emergency_flash_ms: EMERGENCY_FLASH_PERIOD_MS,
        }
    }
}

impl SystemConfig {
    /// The press windows only classify cleanly when
    /// `pause < on_off < emergency`. Checked once at startup.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.pause_display_ms < self.on_off_press_ms
            && self.on_off_press_ms < self.emergency_press_ms
        {
            Ok(())
        } else {
            Err(crate::error::Error::Init(
                "press thresholds must satisfy pause < on_off < emergency",
            ))
        }
    }
}
