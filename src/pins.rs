//! GPIO pin assignments for the homie32 reference board.
//!
//! Single source of truth for pin numbers. The defaults match a stock
//! ESP32 devkit: the BOOT button doubles as the configuration-reset
//! trigger and the onboard LED signals portal activity.

// ---------------------------------------------------------------------------
// Configuration-reset button (active-low with onboard pull-up)
// ---------------------------------------------------------------------------

/// Momentary push-button sampled by the debounced reset trigger.
/// On devkits this is the BOOT button; LOW = pressed.
pub const RESET_BUTTON_GPIO: i32 = 0;

// ---------------------------------------------------------------------------
// Status LED
// ---------------------------------------------------------------------------

/// Digital output driving the onboard status LED (active HIGH).
/// Lit while the provisioning portal is running.
pub const STATUS_LED_GPIO: i32 = 2;
