//! Device lifecycle core for Homie-convention IoT firmware.
//!
//! One boot mode per power cycle (normal, configuration or standalone),
//! a captive provisioning portal, an insertion-ordered node registry and
//! retained topology announcements over MQTT. The lifecycle modules are
//! host-testable; ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` inside the adapter modules.

#![deny(unused_must_use)]

pub mod boot;
pub mod config;
pub mod device;
pub mod error;
pub mod events;
pub mod pins;
pub mod ports;
pub mod publish;
pub mod validate;

// Platform-facing modules; the hardware halves are cfg-guarded inside.
pub mod adapters;
pub mod drivers;
