//! Homie32 Firmware: Main Entry Point
//!
//! Hexagonal composition. The adapters own the platform, one boot mode
//! owns the lifecycle for this power cycle, and main wires them together
//! and spins the cooperative tick loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  DeviceHardware      NvsConfigStore   MqttBrokerLink           │
//! │  (AP+DNS+HTTP+STA)   (ConfigPort)     (PubSubPort)             │
//! │  SystemAdapter       LogEventSink     UptimeClock              │
//! │  (SystemPort)        (EventSink)      (monotonic ms)           │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              BootMode (pure logic)                     │    │
//! │  │  Configuration · Normal · Standalone                   │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  DeviceRegistry · NetworkScanner · ResetTrigger                │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Module declarations ───────────────────────────────────────
pub mod boot;
pub mod config;
pub mod device;
mod error;
mod events;
mod pins;
pub mod ports;
pub mod publish;
pub mod validate;

mod adapters;
mod drivers;

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use log::{error, info, warn};

use adapters::device_id;
use adapters::dns::CaptiveDnsServer;
use adapters::hardware::DeviceHardware;
use adapters::httpd::PortalHttpServer;
use adapters::log_sink::LogEventSink;
use adapters::mqtt::MqttBrokerLink;
use adapters::nvs::NvsConfigStore;
use adapters::system::SystemAdapter;
use adapters::time::UptimeClock;
use adapters::wifi::WifiAdapter;
use boot::{select_boot_mode, ResetSettings, StartupPolicy};
use config::PersistedConfig;
use device::DeviceRegistry;
use ports::{ConfigPort, StoreError, SystemPort};

/// Cooperative loop period. Every mode's `tick` is built to finish well
/// inside this; the debouncer and the scan retrigger count on it being
/// roughly steady.
const TICK_INTERVAL_MS: u64 = 10;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  homie32 v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration store ────────────────────────────────
    let mut store = match NvsConfigStore::new() {
        Ok(s) => s,
        Err(e) => {
            warn!("NVS init failed ({e}), continuing without persistence");
            NvsConfigStore::unavailable()
        }
    };
    let config = match store.load() {
        Ok(cfg) => {
            info!("configuration loaded for '{}'", cfg.hostname);
            cfg
        }
        Err(StoreError::NotFound) => {
            info!("no stored configuration, first boot");
            PersistedConfig::default()
        }
        Err(e) => {
            warn!("configuration unreadable ({e}), treating as unconfigured");
            PersistedConfig::default()
        }
    };

    // ── 3. Device identity ────────────────────────────────────
    let mac = device_id::read_mac();
    let ap_ssid = device_id::ap_ssid(&mac);
    info!(
        "device id {} (portal SSID {})",
        device_id::provisional_hostname(&mac),
        ap_ssid
    );

    // ── 4. Platform adapters ──────────────────────────────────
    let clock = UptimeClock::new();
    let mut system = SystemAdapter::new();
    let mut log_sink = LogEventSink::new();
    let wifi = match WifiAdapter::new() {
        Ok(w) => w,
        Err(e) => {
            // Without the radio nothing below can run; let the
            // watchdog reset us out of the halt.
            error!("wifi init failed: {e}; halting");
            #[allow(clippy::empty_loop)]
            loop {}
        }
    };
    let mut hw = DeviceHardware::new(wifi, CaptiveDnsServer::new(), PortalHttpServer::new());
    let mut mqtt = MqttBrokerLink::new();

    // ── 5. Device registry ────────────────────────────────────
    //
    // Reference wiring: a single switchable light node. Real firmware
    // replaces this block with its own nodes before sealing.
    let mut registry = DeviceRegistry::new();
    match registry.add_node("light", "Light", "switch") {
        Ok(node) => {
            node.advertise("on")
                .set_name("On")
                .set_datatype("boolean")
                .settable_with(|_, value| {
                    info!("light/on set to {value}");
                    matches!(value, "true" | "false")
                });
        }
        Err(e) => error!("node registration failed: {e}"),
    }
    registry.seal();

    // ── 6. Boot mode selection ────────────────────────────────
    let mut mode = select_boot_mode(
        config,
        StartupPolicy::Normal,
        ap_ssid,
        ResetSettings::default(),
    );

    if let Err(e) = mode.setup(&mut hw, &mut system, &mut log_sink, clock.uptime_ms()) {
        error!("{} mode setup failed: {e}; restarting", mode.name());
        system.flush_output();
        system.restart();
        #[cfg(not(target_os = "espidf"))]
        return Err(anyhow::anyhow!("{} mode setup failed: {e}", mode.name()));
    }

    // ── 7. Tick loop ──────────────────────────────────────────
    loop {
        mode.tick(
            &mut hw,
            &mut mqtt,
            &mut registry,
            &mut store,
            &mut system,
            &mut log_sink,
            clock.uptime_ms(),
        );

        // On hardware a requested restart never returns; the check
        // lets host runs exit the loop instead of spinning forever.
        #[cfg(not(target_os = "espidf"))]
        if system.restart_requested() {
            info!("sim: restart requested, leaving tick loop");
            return Ok(());
        }

        std::thread::sleep(std::time::Duration::from_millis(TICK_INTERVAL_MS));
    }
}
