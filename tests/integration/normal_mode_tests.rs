//! Normal-mode stories: join, broker session, advertisement, inbound
//! command routing and the reset path back to the portal.

use core::cell::RefCell;
use std::rc::Rc;

use homie32::boot::{BootMode, ResetSettings, StartupPolicy, select_boot_mode};
use homie32::config::{BootTarget, PersistedConfig};
use homie32::device::DeviceRegistry;
use homie32::error::Error;
use homie32::events::DeviceEvent;
use homie32::ports::NetError;
use homie32::publish::CONVENTION_VERSION;

use crate::mock_net::{EventLog, MockBus, MockNet, MockStore, MockSystem};

fn ssid() -> heapless::String<32> {
    heapless::String::try_from("Homie-c0ffee").unwrap()
}

fn configured() -> PersistedConfig {
    PersistedConfig {
        hostname: "kitchen-lamp".into(),
        wifi_ssid: "shed".into(),
        wifi_password: "hunter2".into(),
        homie_host: "broker.local".into(),
        boot_mode: BootTarget::Normal,
        configured: true,
    }
}

fn normal() -> BootMode {
    select_boot_mode(
        configured(),
        StartupPolicy::Normal,
        ssid(),
        ResetSettings::default(),
    )
}

/// One switchable property; returns the values its handler saw.
fn light_registry() -> (DeviceRegistry, Rc<RefCell<Vec<String>>>) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut registry = DeviceRegistry::new();
    {
        let node = registry.add_node("light", "Light", "switch").unwrap();
        let sink = Rc::clone(&seen);
        node.advertise("power").settable_with(move |_, value| {
            sink.borrow_mut().push(value.to_owned());
            true
        });
    }
    registry.seal();
    (registry, seen)
}

#[test]
fn configured_device_joins_and_comes_online() {
    let mut mode = normal();
    let (mut registry, _) = light_registry();
    let mut hw = MockNet::default();
    let mut bus = MockBus::default();
    let mut store = MockStore::default();
    let mut sys = MockSystem::default();
    let mut sink = EventLog::default();

    // Setup points the station at the stored network.
    mode.setup(&mut hw, &mut sys, &mut sink, 0).unwrap();
    assert_eq!(hw.hostname_set_to(), Some("kitchen-lamp"));
    assert_eq!(hw.last_join(), Some(("shed", "hunter2")));
    assert_eq!(sink.0, [DeviceEvent::NormalMode]);

    // Still associating: nothing reaches the broker.
    mode.tick(&mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink, 10);
    assert!(bus.connect_calls.is_empty());

    // Association complete: the broker connect starts.
    hw.joined = true;
    mode.tick(&mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink, 20);
    assert_eq!(
        bus.connect_calls,
        [("broker.local".to_owned(), "kitchen-lamp".to_owned())]
    );

    // Session up: advertisement and the command subscription.
    bus.connected = true;
    mode.tick(&mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink, 30);
    assert!(sink.contains(DeviceEvent::WifiConnected));
    assert_eq!(sink.0.last(), Some(&DeviceEvent::MqttReady));
    assert_eq!(
        bus.published_topics(),
        [
            "homie/kitchen-lamp/$homie",
            "homie/kitchen-lamp/$name",
            "homie/kitchen-lamp/$nodes",
            "homie/kitchen-lamp/light/$type",
            "homie/kitchen-lamp/light/$properties",
        ]
    );
    assert_eq!(
        bus.payload_of("homie/kitchen-lamp/$homie"),
        Some(CONVENTION_VERSION)
    );
    assert_eq!(bus.payload_of("homie/kitchen-lamp/$nodes"), Some("light"));
    assert_eq!(bus.subscriptions, ["homie/kitchen-lamp/+/+/set"]);
    // The whole advertisement is retained at QoS 1.
    assert!(bus.published.iter().all(|&(.., qos, retained)| qos == 1 && retained));
}

#[test]
fn inbound_set_command_reaches_the_application() {
    let mut mode = normal();
    let (mut registry, seen) = light_registry();
    let mut hw = MockNet {
        joined: true,
        ..MockNet::default()
    };
    let mut bus = MockBus {
        connected: true,
        ..MockBus::default()
    };
    let mut store = MockStore::default();
    let mut sys = MockSystem::default();
    let mut sink = EventLog::default();

    mode.setup(&mut hw, &mut sys, &mut sink, 0).unwrap();
    mode.tick(&mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink, 10);
    mode.tick(&mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink, 20);
    assert!(sink.contains(DeviceEvent::MqttReady));

    bus.inject_set("homie/kitchen-lamp/light/power/set", "true");
    // Chatter outside the command shape is ignored without effect.
    bus.inject_set("homie/kitchen-lamp/light/power", "stray");
    bus.inject_set("homie/other-device/light/power/set", "foreign");
    mode.tick(&mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink, 30);

    assert_eq!(seen.borrow().as_slice(), ["true".to_owned()]);
}

#[test]
fn lost_wifi_rejoins_and_readvertises() {
    let mut mode = normal();
    let (mut registry, _) = light_registry();
    let mut hw = MockNet {
        joined: true,
        ..MockNet::default()
    };
    let mut bus = MockBus {
        connected: true,
        ..MockBus::default()
    };
    let mut store = MockStore::default();
    let mut sys = MockSystem::default();
    let mut sink = EventLog::default();

    mode.setup(&mut hw, &mut sys, &mut sink, 0).unwrap();
    mode.tick(&mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink, 10);
    mode.tick(&mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink, 20);
    let announce_len = bus.published.len();

    // The link drops; both disconnect events fire.
    hw.joined = false;
    bus.connected = false;
    mode.tick(&mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink, 30);
    assert!(sink.contains(DeviceEvent::WifiDisconnected));
    assert!(sink.contains(DeviceEvent::MqttDisconnected));

    // It comes back; the device runs the whole ladder again.
    hw.joined = true;
    mode.tick(&mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink, 40);
    bus.connected = true;
    mode.tick(&mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink, 50);
    assert_eq!(bus.connect_calls.len(), 2);
    assert_eq!(bus.published.len(), 2 * announce_len);
}

#[test]
fn held_reset_button_restarts_into_the_portal() {
    let mut mode = normal();
    let (mut registry, _) = light_registry();
    let mut hw = MockNet {
        joined: true,
        ..MockNet::default()
    };
    let mut bus = MockBus::default();
    let mut store = MockStore {
        saved: Some(configured()),
        ..MockStore::default()
    };
    let mut sys = MockSystem::default();
    let mut sink = EventLog::default();

    mode.setup(&mut hw, &mut sys, &mut sink, 0).unwrap();

    // Button pressed (active low) and held across the debounce interval.
    hw.reset_level = false;
    mode.tick(&mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink, 0);
    assert_eq!(sys.restarts, 0);
    mode.tick(&mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink, 60);

    assert_eq!(sys.restarts, 1);
    assert_eq!(sys.flushes, 1);
    assert_eq!(sink.0.last(), Some(&DeviceEvent::AboutToReset));
    let saved = store.saved.unwrap();
    // The marker flips the boot target and keeps the credentials.
    assert_eq!(saved.boot_mode, BootTarget::Config);
    assert_eq!(saved.wifi_ssid, "shed");
    assert!(saved.configured);
}

#[test]
fn setup_aborts_when_the_join_cannot_start() {
    let mut mode = normal();
    let mut hw = MockNet {
        fail_join: true,
        ..MockNet::default()
    };
    let mut sys = MockSystem::default();
    let mut sink = EventLog::default();

    let err = mode.setup(&mut hw, &mut sys, &mut sink, 0).unwrap_err();
    assert_eq!(err, Error::Net(NetError::JoinFailed));
}
