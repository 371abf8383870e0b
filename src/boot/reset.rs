//! Reset-to-configuration trigger.
//!
//! Shared by normal and standalone mode: a debounced hardware input and a
//! software flag both funnel into the one-way `flagged_for_config` latch.
//! The owning mode checks [`ResetTrigger::should_restart_to_config`] once
//! per tick and, when it fires, persists the bypass marker and restarts.

use log::{error, info};

use crate::config::BootTarget;
use crate::drivers::debounce::Debouncer;
use crate::events::{DeviceEvent, EventSink};
use crate::ports::{ConfigPort, ResetInputPort, SystemPort};

/// Static wiring of the reset input.
#[derive(Debug, Clone, Copy)]
pub struct ResetSettings {
    /// When false the hardware input is ignored; the software flag
    /// still works.
    pub enabled: bool,
    /// Logic level that counts as "trigger active".
    pub trigger_level: bool,
    /// How long the level must hold before it is believed.
    pub debounce_ms: u64,
}

impl Default for ResetSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            // Active-low momentary switch with pull-up.
            trigger_level: false,
            debounce_ms: 50,
        }
    }
}

/// Debounced trigger with a one-way flag and an idle gate.
#[derive(Debug)]
pub struct ResetTrigger {
    settings: ResetSettings,
    debouncer: Debouncer,
    flagged_for_config: bool,
    flagged_by_sketch: bool,
    idle: bool,
}

impl ResetTrigger {
    pub fn new(settings: ResetSettings) -> Self {
        Self {
            settings,
            // Seed with the inactive level so boot-time pin state does not
            // count as a press until it survives the debounce interval.
            debouncer: Debouncer::new(settings.debounce_ms, !settings.trigger_level),
            flagged_for_config: false,
            flagged_by_sketch: false,
            idle: true,
        }
    }

    /// Sample the input and merge the software flag. Call once per tick.
    pub fn sample(&mut self, input: &mut impl ResetInputPort, now_ms: u64) {
        if self.settings.enabled {
            self.debouncer.update(input.read_reset_input(), now_ms);
            if self.debouncer.read() == self.settings.trigger_level && !self.flagged_for_config {
                self.flagged_for_config = true;
                info!("flagged for configuration mode by reset input");
            }
        }
        if self.flagged_by_sketch && !self.flagged_for_config {
            self.flagged_for_config = true;
            info!("flagged for configuration mode by application");
        }
    }

    /// Software path into the same latch. Takes effect on the next tick.
    pub fn flag_for_config(&mut self) {
        self.flagged_by_sketch = true;
    }

    /// Gate the restart on application quiescence. Defaults to idle.
    pub fn set_idle(&mut self, idle: bool) {
        self.idle = idle;
    }

    /// One-way latch state.
    pub fn is_flagged(&self) -> bool {
        self.flagged_for_config
    }

    /// True when the latch is set and the application reports idle.
    pub fn should_restart_to_config(&self) -> bool {
        self.flagged_for_config && self.idle
    }
}

/// Consummate a fired trigger: persist the marker that forces the next
/// boot into configuration mode, announce the restart, flush, go down.
/// One-shot with no rollback; a failed marker save is logged and the
/// restart proceeds, since the next boot still lands somewhere recoverable.
pub(crate) fn restart_into_config(
    store: &mut impl ConfigPort,
    sys: &mut impl SystemPort,
    sink: &mut impl EventSink,
) {
    let mut config = store.load().unwrap_or_default();
    config.boot_mode = BootTarget::Config;
    if let Err(e) = store.save(&config) {
        error!("could not persist configuration-mode marker: {e}");
    }
    info!("restarting into configuration mode");
    sink.emit(DeviceEvent::AboutToReset);
    sys.flush_output();
    sys.restart();
}
