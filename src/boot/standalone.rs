//! Standalone mode: the sketch runs with the radio left alone.
//!
//! No station join, no broker. The only lifecycle service still armed is
//! the reset trigger, so a held button or a software flag can always bring
//! the device back into configuration mode.

use log::info;

use crate::boot::reset::{self, ResetSettings, ResetTrigger};
use crate::error::Error;
use crate::events::{DeviceEvent, EventSink};
use crate::ports::{ConfigPort, ResetInputPort, SystemPort};

/// Standalone-mode state. One instance lives for the whole boot.
#[derive(Debug)]
pub struct BootStandalone {
    reset: ResetTrigger,
}

impl BootStandalone {
    pub fn new(reset_settings: ResetSettings) -> Self {
        Self {
            reset: ResetTrigger::new(reset_settings),
        }
    }

    pub fn setup(
        &mut self,
        sys: &mut impl SystemPort,
        sink: &mut impl EventSink,
    ) -> Result<(), Error> {
        info!("booting into standalone mode");
        sink.emit(DeviceEvent::StandaloneMode);
        sys.set_status_led(false);
        Ok(())
    }

    /// One cooperative slice: sample the trigger, restart when it fires.
    pub fn tick(
        &mut self,
        input: &mut impl ResetInputPort,
        store: &mut impl ConfigPort,
        sys: &mut impl SystemPort,
        sink: &mut impl EventSink,
        now_ms: u64,
    ) {
        self.reset.sample(input, now_ms);
        if self.reset.should_restart_to_config() {
            reset::restart_into_config(store, sys, sink);
        }
    }

    /// Software path onto the reset latch.
    pub fn flag_for_config(&mut self) {
        self.reset.flag_for_config();
    }

    /// Report application quiescence; the restart waits for it.
    pub fn set_idle(&mut self, idle: bool) {
        self.reset.set_idle(idle);
    }

    pub fn is_flagged_for_config(&self) -> bool {
        self.reset.is_flagged()
    }
}
