//! Standalone-mode stories: the sketch runs, the radio stays untouched,
//! and the reset trigger still works.

use homie32::boot::{BootMode, ResetSettings, StartupPolicy, select_boot_mode};
use homie32::config::{BootTarget, PersistedConfig};
use homie32::device::DeviceRegistry;
use homie32::events::DeviceEvent;

use crate::mock_net::{EventLog, MockBus, MockNet, MockStore, MockSystem, NetCall};

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

fn standalone() -> BootMode {
    select_boot_mode(
        configured(),
        StartupPolicy::Standalone,
        ssid(),
        ResetSettings::default(),
    )
}

#[test]
fn standalone_leaves_the_network_alone() {
    let mut mode = standalone();
    let mut hw = MockNet::default();
    let mut bus = MockBus::default();
    let mut registry = DeviceRegistry::new();
    let mut store = MockStore::default();
    let mut sys = MockSystem::default();
    let mut sink = EventLog::default();

    mode.setup(&mut hw, &mut sys, &mut sink, 0).unwrap();
    for now in (0..500).step_by(10) {
        mode.tick(&mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink, now);
    }

    assert_eq!(sink.0, [DeviceEvent::StandaloneMode]);
    // No AP, no scan, no join, no broker: the radio was never touched.
    assert!(hw.calls.is_empty());
    assert!(bus.connect_calls.is_empty());
    assert!(bus.published.is_empty());
    assert_eq!(sys.restarts, 0);
}

#[test]
fn held_button_still_reaches_the_portal() {
    let mut mode = standalone();
    let mut hw = MockNet::default();
    let mut bus = MockBus::default();
    let mut registry = DeviceRegistry::new();
    let mut store = MockStore {
        saved: Some(configured()),
        ..MockStore::default()
    };
    let mut sys = MockSystem::default();
    let mut sink = EventLog::default();

    mode.setup(&mut hw, &mut sys, &mut sink, 0).unwrap();

    hw.reset_level = false;
    mode.tick(&mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink, 0);
    mode.tick(&mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink, 60);

    assert_eq!(sys.restarts, 1);
    assert_eq!(store.saved.unwrap().boot_mode, BootTarget::Config);
    assert_eq!(
        sink.0,
        [DeviceEvent::StandaloneMode, DeviceEvent::AboutToReset]
    );
    // The trigger sampled the input but nothing network-facing ran.
    assert!(!hw.calls.iter().any(|c| matches!(
        c,
        NetCall::StartAp { .. } | NetCall::Join { .. } | NetCall::StartScan
    )));
}

#[test]
fn software_flag_defers_until_the_sketch_is_idle() {
    let mut mode = standalone();
    let mut hw = MockNet::default();
    let mut bus = MockBus::default();
    let mut registry = DeviceRegistry::new();
    let mut store = MockStore::default();
    let mut sys = MockSystem::default();
    let mut sink = EventLog::default();

    mode.setup(&mut hw, &mut sys, &mut sink, 0).unwrap();

    // The sketch is mid-operation when it asks for reconfiguration.
    mode.set_idle(false);
    mode.flag_for_config();
    mode.tick(&mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink, 10);
    assert_eq!(sys.restarts, 0);
    assert!(store.saved.is_none());

    // Once it reports idle, the restart goes through.
    mode.set_idle(true);
    mode.tick(&mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink, 20);
    assert_eq!(sys.restarts, 1);
    assert_eq!(store.saved.unwrap().boot_mode, BootTarget::Config);
}
