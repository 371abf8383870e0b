//! System control adapter: restart, output flush, status LED.
//!
//! Implements [`SystemPort`]. On hardware `restart` goes through
//! `esp_restart()` and never returns; the host build records the request
//! instead so a simulation loop can observe it and wind down.

use crate::ports::SystemPort;

#[cfg(target_os = "espidf")]
use crate::pins;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::{
    gpio_config, gpio_config_t, gpio_int_type_t_GPIO_INTR_DISABLE, gpio_mode_t_GPIO_MODE_OUTPUT,
    gpio_pulldown_t_GPIO_PULLDOWN_DISABLE, gpio_pullup_t_GPIO_PULLUP_DISABLE, gpio_set_level,
    ESP_OK,
};

pub struct SystemAdapter {
    restart_requested: bool,
    led_on: bool,
}

impl SystemAdapter {
    /// Configure the status LED pin and start with it off.
    pub fn new() -> Self {
        #[cfg(target_os = "espidf")]
        {
            let cfg = gpio_config_t {
                pin_bit_mask: 1u64 << pins::STATUS_LED_GPIO,
                mode: gpio_mode_t_GPIO_MODE_OUTPUT,
                pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
                pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
                intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
            };
            // SAFETY: called once from the single-threaded init path.
            let ret = unsafe { gpio_config(&cfg) };
            if ret != ESP_OK {
                log::warn!("status LED pin config failed (rc={ret}), LED disabled");
            }
            unsafe { gpio_set_level(pins::STATUS_LED_GPIO, 0) };
        }

        Self {
            restart_requested: false,
            led_on: false,
        }
    }

    /// Current LED level, for host-side assertions.
    pub fn led_on(&self) -> bool {
        self.led_on
    }
}

impl Default for SystemAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemPort for SystemAdapter {
    fn restart(&mut self) {
        self.restart_requested = true;

        #[cfg(target_os = "espidf")]
        unsafe {
            esp_idf_svc::sys::esp_restart();
        }

        #[cfg(not(target_os = "espidf"))]
        log::info!("sim: restart requested");
    }

    fn restart_requested(&self) -> bool {
        self.restart_requested
    }

    fn flush_output(&mut self) {
        // Logging goes through stdout on both targets (VFS-routed UART on
        // the device), so one flush covers them.
        use std::io::Write;
        let _ = std::io::stdout().flush();
    }

    fn set_status_led(&mut self, on: bool) {
        self.led_on = on;

        #[cfg(target_os = "espidf")]
        // SAFETY: gpio_set_level writes to the pin configured in new().
        unsafe {
            gpio_set_level(pins::STATUS_LED_GPIO, u32::from(on));
        }
    }
}
