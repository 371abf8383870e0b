//! Boot mode selection and the uniform lifecycle.
//!
//! Exactly one mode is chosen per power cycle, before the loop starts, and
//! never changes while the process lives. Leaving a mode means restarting.
//!
//! ```text
//!   load config ──▶ select_boot_mode ──▶ setup() ──▶ tick() ... restart
//! ```

pub mod config;
pub mod normal;
pub mod reset;
pub mod scan;
pub mod standalone;

pub use config::BootConfig;
pub use normal::BootNormal;
pub use reset::{ResetSettings, ResetTrigger};
pub use scan::NetworkScanner;
pub use standalone::BootStandalone;

use log::info;

use crate::config::PersistedConfig;
use crate::device::DeviceRegistry;
use crate::error::Error;
use crate::events::EventSink;
use crate::ports::{BootHardware, ConfigPort, PubSubPort, SystemPort};

/// What a fully configured device should do: serve the broker or run the
/// sketch alone. The choice belongs to the application, not to this crate,
/// so it arrives as an argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartupPolicy {
    #[default]
    Normal,
    Standalone,
}

/// The mode selected for this power cycle.
#[derive(Debug)]
pub enum BootMode {
    Configuration(BootConfig),
    Normal(BootNormal),
    Standalone(BootStandalone),
}

/// Selection rule: an unconfigured device, or one whose stored record asks
/// for it, boots the portal. Otherwise the policy decides.
pub fn select_boot_mode(
    config: PersistedConfig,
    policy: StartupPolicy,
    ap_ssid: heapless::String<32>,
    reset_settings: ResetSettings,
) -> BootMode {
    if config.wants_config_mode() {
        info!("selected configuration mode");
        return BootMode::Configuration(BootConfig::new(ap_ssid));
    }
    match policy {
        StartupPolicy::Normal => {
            info!("selected normal mode");
            BootMode::Normal(BootNormal::new(config, reset_settings))
        }
        StartupPolicy::Standalone => {
            info!("selected standalone mode");
            BootMode::Standalone(BootStandalone::new(reset_settings))
        }
    }
}

impl BootMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Normal(_) => "normal",
            Self::Standalone(_) => "standalone",
        }
    }

    /// One-time bring-up for the selected mode. A failure here is fatal;
    /// the caller logs it and restarts rather than entering the loop.
    pub fn setup(
        &mut self,
        hw: &mut impl BootHardware,
        sys: &mut impl SystemPort,
        sink: &mut impl EventSink,
        now_ms: u64,
    ) -> Result<(), Error> {
        match self {
            Self::Configuration(mode) => mode.setup(hw, sys, sink, now_ms),
            Self::Normal(mode) => mode.setup(hw, sys, sink),
            Self::Standalone(mode) => mode.setup(sys, sink),
        }
    }

    /// One cooperative slice of the selected mode. Must not block.
    pub fn tick(
        &mut self,
        hw: &mut impl BootHardware,
        bus: &mut impl PubSubPort,
        registry: &mut DeviceRegistry,
        store: &mut impl ConfigPort,
        sys: &mut impl SystemPort,
        sink: &mut impl EventSink,
        now_ms: u64,
    ) {
        match self {
            Self::Configuration(mode) => mode.tick(hw, store, sys, sink, now_ms),
            Self::Normal(mode) => mode.tick(hw, bus, registry, store, sys, sink, now_ms),
            Self::Standalone(mode) => mode.tick(hw, store, sys, sink, now_ms),
        }
    }

    /// Software path onto the reset latch. No effect while the portal is
    /// already running.
    pub fn flag_for_config(&mut self) {
        match self {
            Self::Configuration(_) => {}
            Self::Normal(mode) => mode.flag_for_config(),
            Self::Standalone(mode) => mode.flag_for_config(),
        }
    }

    /// Report application quiescence to the reset trigger.
    pub fn set_idle(&mut self, idle: bool) {
        match self {
            Self::Configuration(_) => {}
            Self::Normal(mode) => mode.set_idle(idle),
            Self::Standalone(mode) => mode.set_idle(idle),
        }
    }
}
