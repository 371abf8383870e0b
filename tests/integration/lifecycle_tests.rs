//! Whole-lifecycle stories across simulated power cycles: the persisted
//! record is the only state that survives, and each "boot" re-runs
//! selection from whatever the previous life left in the store.

use homie32::boot::config::RESTART_GRACE_MS;
use homie32::boot::{BootMode, ResetSettings, StartupPolicy, select_boot_mode};
use homie32::config::{BootTarget, PersistedConfig};
use homie32::device::DeviceRegistry;
use homie32::ports::{ConfigPort, HttpMethod, SystemPort};

use crate::mock_net::{EventLog, MockBus, MockNet, MockStore, MockSystem};

const GOOD_BODY: &[u8] = br#"{
    "name": "kitchen-lamp",
    "wifi_ssid": "shed",
    "wifi_password": "hunter2",
    "homie_host": "broker.local"
}"#;

fn ssid() -> heapless::String<32> {
    heapless::String::try_from("Homie-c0ffee").unwrap()
}

/// Boot as the firmware does: load or default, then select.
fn boot(store: &MockStore, policy: StartupPolicy) -> BootMode {
    let config = store.load().unwrap_or_default();
    select_boot_mode(config, policy, ssid(), ResetSettings::default())
}

#[test]
fn factory_device_provisions_then_comes_up_normal() {
    let mut store = MockStore::default();

    // Life 1: nothing stored, the portal comes up and takes a config.
    let mut mode = boot(&store, StartupPolicy::Normal);
    assert_eq!(mode.name(), "configuration");

    let mut hw = MockNet::default();
    let mut bus = MockBus::default();
    let mut registry = DeviceRegistry::new();
    let mut sys = MockSystem::default();
    let mut sink = EventLog::default();

    mode.setup(&mut hw, &mut sys, &mut sink, 0).unwrap();
    hw.inject(HttpMethod::Put, "/config", GOOD_BODY);
    mode.tick(&mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink, 100);
    mode.tick(
        &mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink,
        100 + RESTART_GRACE_MS,
    );
    assert!(sys.restart_requested());

    // Life 2: the saved record selects normal mode and joins with the
    // credentials the portal took.
    let mut mode = boot(&store, StartupPolicy::Normal);
    assert_eq!(mode.name(), "normal");

    let mut hw = MockNet::default();
    let mut sys = MockSystem::default();
    let mut sink = EventLog::default();
    mode.setup(&mut hw, &mut sys, &mut sink, 0).unwrap();
    assert_eq!(hw.last_join(), Some(("shed", "hunter2")));
    assert_eq!(hw.hostname_set_to(), Some("kitchen-lamp"));
}

#[test]
fn reset_marker_detours_through_the_portal_exactly_once() {
    let mut store = MockStore {
        saved: Some(PersistedConfig {
            hostname: "kitchen-lamp".into(),
            wifi_ssid: "shed".into(),
            wifi_password: "hunter2".into(),
            homie_host: "broker.local".into(),
            boot_mode: BootTarget::Normal,
            configured: true,
        }),
        ..MockStore::default()
    };

    // Life 1: normal mode until the button is held.
    let mut mode = boot(&store, StartupPolicy::Normal);
    assert_eq!(mode.name(), "normal");

    let mut hw = MockNet::default();
    let mut bus = MockBus::default();
    let mut registry = DeviceRegistry::new();
    let mut sys = MockSystem::default();
    let mut sink = EventLog::default();
    mode.setup(&mut hw, &mut sys, &mut sink, 0).unwrap();
    hw.reset_level = false;
    mode.tick(&mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink, 0);
    mode.tick(&mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink, 60);
    assert!(sys.restart_requested());
    assert_eq!(store.saved.as_ref().unwrap().boot_mode, BootTarget::Config);

    // Life 2: the marker wins over the stored credentials.
    let mut mode = boot(&store, StartupPolicy::Normal);
    assert_eq!(mode.name(), "configuration");

    let mut hw = MockNet::default();
    let mut sys = MockSystem::default();
    let mut sink = EventLog::default();
    mode.setup(&mut hw, &mut sys, &mut sink, 0).unwrap();
    hw.inject(HttpMethod::Put, "/config", GOOD_BODY);
    mode.tick(&mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink, 100);

    // Re-provisioning clears the marker, so life 3 is normal again.
    assert_eq!(store.saved.as_ref().unwrap().boot_mode, BootTarget::Normal);
    let mode = boot(&store, StartupPolicy::Normal);
    assert_eq!(mode.name(), "normal");
}

#[test]
fn standalone_policy_applies_only_once_configured() {
    // Unconfigured: the portal wins regardless of policy.
    let store = MockStore::default();
    let mode = boot(&store, StartupPolicy::Standalone);
    assert_eq!(mode.name(), "configuration");

    // Configured: the policy decides.
    let store = MockStore {
        saved: Some(PersistedConfig {
            hostname: "kitchen-lamp".into(),
            wifi_ssid: "shed".into(),
            wifi_password: "hunter2".into(),
            homie_host: "broker.local".into(),
            boot_mode: BootTarget::Normal,
            configured: true,
        }),
        ..MockStore::default()
    };
    let mode = boot(&store, StartupPolicy::Standalone);
    assert_eq!(mode.name(), "standalone");
}
