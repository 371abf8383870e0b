//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing lifecycle events to the ESP-IDF
//! logger (UART / USB-CDC in production). Application code that wants to
//! react to events, say by driving an LED pattern, implements the same
//! trait and is handed to the boot mode instead.

use log::{info, warn};

use crate::events::{DeviceEvent, EventSink};

/// Adapter that logs every [`DeviceEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::StandaloneMode => info!("MODE  | standalone"),
            DeviceEvent::ConfigurationMode => info!("MODE  | configuration (portal active)"),
            DeviceEvent::NormalMode => info!("MODE  | normal"),
            DeviceEvent::WifiConnected => info!("WIFI  | connected"),
            DeviceEvent::WifiDisconnected => warn!("WIFI  | disconnected, rejoining"),
            DeviceEvent::MqttReady => info!("MQTT  | session up, device advertised"),
            DeviceEvent::MqttDisconnected => warn!("MQTT  | session lost"),
            DeviceEvent::AboutToReset => info!("RESET | restarting now"),
        }
    }
}
