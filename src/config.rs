//! Persisted device configuration
//!
//! The logical record the device carries across reboots. It is written by the
//! captive portal after a successful `PUT /config` and read exactly once at
//! boot to select the boot mode. The byte layout on flash belongs to the
//! storage adapter; this module only defines the fields and their meaning.

use serde::{Deserialize, Serialize};

use crate::validate::hostname_is_valid;

/// Which mode the device should land in on the next boot.
///
/// Stored alongside the credentials so a running device can flag itself for
/// reconfiguration (`Config`) without touching anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BootTarget {
    /// Connect to the configured network and broker.
    Normal,
    /// Bring up the provisioning portal on next boot.
    Config,
}

/// Device configuration persisted across reboots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedConfig {
    /// Device name, used as MQTT topic segment and network hostname.
    /// Lowercase `[a-z0-9-]`, never starting or ending with a dash.
    pub hostname: String,
    /// SSID of the network to join in normal mode.
    pub wifi_ssid: String,
    /// Passphrase for `wifi_ssid`. May be empty (open network).
    pub wifi_password: String,
    /// Host name or address of the MQTT broker.
    pub homie_host: String,
    /// Requested mode for the next boot.
    pub boot_mode: BootTarget,
    /// True once a configuration has been accepted by the portal.
    /// While false the device always boots into configuration mode.
    pub configured: bool,
}

impl Default for PersistedConfig {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            wifi_ssid: String::new(),
            wifi_password: String::new(),
            homie_host: String::new(),
            boot_mode: BootTarget::Normal,
            configured: false,
        }
    }
}

impl PersistedConfig {
    /// Boot-mode selection rule: an unconfigured device, or one whose last
    /// run requested reconfiguration, lands in configuration mode.
    pub fn wants_config_mode(&self) -> bool {
        !self.configured || self.boot_mode == BootTarget::Config
    }

    /// Holds when `configured` is honest: all required fields are present and
    /// the hostname obeys the topic-safe alphabet. The store refuses to
    /// persist records that break this.
    pub fn is_coherent(&self) -> bool {
        if !self.configured {
            return true;
        }
        !self.hostname.is_empty()
            && !self.wifi_ssid.is_empty()
            && !self.homie_host.is_empty()
            && hostname_is_valid(&self.hostname)
    }
}
