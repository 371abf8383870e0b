//! Normal mode: join the configured network, establish the broker session,
//! advertise the device and route inbound `set` commands.
//!
//! Connection progress is a three-phase machine re-entered from the left
//! whenever a link drops. Join and broker reconnects are owned by the
//! adapters; this layer watches the edges, announces them as events, and
//! (re)publishes the advertisement each time a broker session comes up.

use log::{error, info, warn};

use crate::boot::reset::{self, ResetSettings, ResetTrigger};
use crate::config::PersistedConfig;
use crate::device::{DeviceRegistry, SetOutcome};
use crate::error::Error;
use crate::events::{DeviceEvent, EventSink};
use crate::ports::{
    ConfigPort, InboundMessage, NetError, PubSubPort, ResetInputPort, StationPort, SystemPort,
};
use crate::publish::{CONVENTION_VERSION, TopicRoot};

/// Inbound messages routed per tick before yielding the loop.
const MAX_INBOUND_PER_TICK: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Waiting for the station association to complete.
    Joining,
    /// Associated; waiting for the broker session.
    ConnectingBroker,
    /// Broker session up, advertisement published, routing commands.
    Online,
}

/// Normal-mode state. One instance lives for the whole boot.
#[derive(Debug)]
pub struct BootNormal {
    config: PersistedConfig,
    root: TopicRoot,
    reset: ResetTrigger,
    phase: Phase,
}

impl BootNormal {
    pub fn new(config: PersistedConfig, reset_settings: ResetSettings) -> Self {
        let root = TopicRoot::new(&config.hostname);
        Self {
            config,
            root,
            reset: ResetTrigger::new(reset_settings),
            phase: Phase::Joining,
        }
    }

    /// Start the station association. Any failure aborts the boot.
    pub fn setup(
        &mut self,
        station: &mut impl StationPort,
        sys: &mut impl SystemPort,
        sink: &mut impl EventSink,
    ) -> Result<(), Error> {
        info!("booting into normal mode as '{}'", self.config.hostname);
        sink.emit(DeviceEvent::NormalMode);
        sys.set_status_led(false);

        station.set_hostname(&self.config.hostname);
        station.join(&self.config.wifi_ssid, &self.config.wifi_password)?;
        Ok(())
    }

    /// One cooperative slice: reset trigger, station bookkeeping, phase
    /// edges, then a bounded inbound drain while online.
    pub fn tick(
        &mut self,
        link: &mut (impl StationPort + ResetInputPort),
        bus: &mut impl PubSubPort,
        registry: &mut DeviceRegistry,
        store: &mut impl ConfigPort,
        sys: &mut impl SystemPort,
        sink: &mut impl EventSink,
        now_ms: u64,
    ) {
        self.reset.sample(link, now_ms);
        if self.reset.should_restart_to_config() {
            reset::restart_into_config(store, sys, sink);
            return;
        }

        link.poll_station();

        match self.phase {
            Phase::Joining => {
                if link.is_joined() {
                    sink.emit(DeviceEvent::WifiConnected);
                    info!(
                        "wifi connected, reaching broker '{}'",
                        self.config.homie_host
                    );
                    if let Err(e) =
                        bus.connect_broker(&self.config.homie_host, &self.config.hostname)
                    {
                        error!("broker connection could not be started: {e}");
                    }
                    self.phase = Phase::ConnectingBroker;
                }
            }
            Phase::ConnectingBroker => {
                if !link.is_joined() {
                    self.on_wifi_drop(sink);
                } else if bus.is_broker_connected() {
                    match self.announce(registry, bus) {
                        Ok(()) => {
                            sink.emit(DeviceEvent::MqttReady);
                            info!("broker session established, device advertised");
                            self.phase = Phase::Online;
                        }
                        // The session may have dropped mid-advertisement;
                        // next tick re-checks and retries.
                        Err(e) => warn!("device advertisement failed: {e}"),
                    }
                }
            }
            Phase::Online => {
                if !link.is_joined() {
                    self.on_wifi_drop(sink);
                } else if !bus.is_broker_connected() {
                    sink.emit(DeviceEvent::MqttDisconnected);
                    warn!("broker session lost, waiting for reconnect");
                    self.phase = Phase::ConnectingBroker;
                } else {
                    for _ in 0..MAX_INBOUND_PER_TICK {
                        let Some(message) = bus.poll_inbound() else {
                            break;
                        };
                        self.route_inbound(registry, &message);
                    }
                }
            }
        }
    }

    fn on_wifi_drop(&mut self, sink: &mut impl EventSink) {
        sink.emit(DeviceEvent::WifiDisconnected);
        if self.phase == Phase::Online {
            sink.emit(DeviceEvent::MqttDisconnected);
        }
        warn!("wifi connection lost, rejoining '{}'", self.config.wifi_ssid);
        self.phase = Phase::Joining;
    }

    /// Retained device advertisement plus the command subscription, sent on
    /// every (re)established broker session.
    fn announce(
        &self,
        registry: &DeviceRegistry,
        bus: &mut impl PubSubPort,
    ) -> Result<(), NetError> {
        bus.publish(&self.root.device_topic("$homie"), CONVENTION_VERSION, 1, true)?;
        bus.publish(&self.root.device_topic("$name"), &self.config.hostname, 1, true)?;
        registry.publish_advertisement(&self.root, bus)?;
        bus.subscribe(&self.root.set_wildcard(), 1)?;
        Ok(())
    }

    fn route_inbound(&mut self, registry: &mut DeviceRegistry, message: &InboundMessage) {
        let Some((node_id, property_segment)) = self.root.parse_set_topic(&message.topic) else {
            warn!("ignoring message on unexpected topic '{}'", message.topic);
            return;
        };
        match registry.dispatch_set(node_id, property_segment, &message.payload) {
            SetOutcome::Accepted => {}
            outcome => warn!(
                "set '{}' on {}/{} not applied: {:?}",
                message.payload, node_id, property_segment, outcome
            ),
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

    /// True while the broker session is up and commands flow.
    pub fn is_online(&self) -> bool {
        self.phase == Phase::Online
    }
}
