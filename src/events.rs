//! Lifecycle events emitted by the boot modes.
//!
//! The modes emit these through the [`EventSink`] port. Adapters on the
//! other side decide what to do with them: log to the console, blink an
//! LED, notify application code. Emission is synchronous and in-tick; in
//! particular [`DeviceEvent::AboutToReset`] is delivered before the restart
//! it announces, never after.

/// Structured lifecycle events emitted by the device core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    /// The device booted into standalone mode.
    StandaloneMode,
    /// The device booted into configuration mode (captive portal active).
    ConfigurationMode,
    /// The device booted into normal mode.
    NormalMode,
    /// Normal mode joined the configured Wi-Fi network.
    WifiConnected,
    /// Normal mode lost the Wi-Fi association and is re-joining.
    WifiDisconnected,
    /// The broker connection is up and the device advertisement published.
    MqttReady,
    /// The broker connection dropped.
    MqttDisconnected,
    /// The device restarts after this event returns. Last chance to act.
    AboutToReset,
}

/// Consumer side of the event stream.
///
/// Implementations must not block: they run inside the cooperative tick.
pub trait EventSink {
    fn emit(&mut self, event: DeviceEvent);
}

/// Sink that drops everything. Useful as a default and in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&mut self, _event: DeviceEvent) {}
}
