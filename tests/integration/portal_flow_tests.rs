//! Captive portal stories: bring-up order, the three endpoints, the
//! provisioning round trip and the background rescan, all driven through
//! `BootMode` the way the firmware loop drives it.

use homie32::boot::config::{DNS_TTL_SECS, PORTAL_GATEWAY, PORTAL_NETMASK, RESTART_GRACE_MS};
use homie32::boot::scan::{EMPTY_NETWORKS_DOC, Encryption, NetworkRecord, RESCAN_INTERVAL_MS};
use homie32::boot::{BootMode, ResetSettings, StartupPolicy, select_boot_mode};
use homie32::config::{BootTarget, PersistedConfig};
use homie32::device::DeviceRegistry;
use homie32::error::Error;
use homie32::events::DeviceEvent;
use homie32::ports::{HttpMethod, NetError, ScanPoll};

use crate::mock_net::{EventLog, MockBus, MockNet, MockStore, MockSystem, NetCall};

const GOOD_BODY: &[u8] = br#"{
    "name": "kitchen-lamp",
    "wifi_ssid": "shed",
    "wifi_password": "hunter2",
    "homie_host": "broker.local"
}"#;

fn ssid() -> heapless::String<32> {
    heapless::String::try_from("Homie-c0ffee").unwrap()
}

/// A factory-fresh device always selects the portal.
fn portal() -> BootMode {
    select_boot_mode(
        PersistedConfig::default(),
        StartupPolicy::Normal,
        ssid(),
        ResetSettings::default(),
    )
}

fn net(ssid: &str, rssi: i32) -> NetworkRecord {
    NetworkRecord {
        ssid: ssid.into(),
        rssi,
        encryption: Encryption::Wpa2,
    }
}

#[test]
fn first_boot_brings_up_the_portal_in_order() {
    let mut mode = portal();
    let mut hw = MockNet::default();
    let mut sys = MockSystem::default();
    let mut sink = EventLog::default();

    mode.setup(&mut hw, &mut sys, &mut sink, 0).unwrap();

    // AP first, then the synchronous sweep, then DNS, then HTTP.
    assert_eq!(
        hw.calls,
        [
            NetCall::StartAp {
                ssid: "Homie-c0ffee".into(),
                gateway: PORTAL_GATEWAY,
                netmask: PORTAL_NETMASK,
            },
            NetCall::BlockingScan,
            NetCall::StartDns {
                addr: PORTAL_GATEWAY,
                ttl_secs: DNS_TTL_SECS,
            },
            NetCall::StartHttp,
        ]
    );
    assert_eq!(sink.0, [DeviceEvent::ConfigurationMode]);
    // Portal mode announces itself on the status LED.
    assert_eq!(sys.led, Some(true));
}

#[test]
fn setup_aborts_on_the_first_failing_service() {
    let mut mode = portal();
    let mut hw = MockNet {
        fail_ap: true,
        ..MockNet::default()
    };
    let mut sys = MockSystem::default();
    let mut sink = EventLog::default();

    let err = mode.setup(&mut hw, &mut sys, &mut sink, 0).unwrap_err();
    assert_eq!(err, Error::Net(NetError::ApStartFailed));
    // Nothing beyond the failed AP start was attempted.
    assert!(hw.dns_started_with().is_none());
    assert!(!hw.calls.contains(&NetCall::StartHttp));

    let mut mode = portal();
    let mut hw = MockNet {
        fail_dns: true,
        ..MockNet::default()
    };
    let err = mode.setup(&mut hw, &mut sys, &mut sink, 0).unwrap_err();
    assert_eq!(err, Error::Net(NetError::DnsStartFailed));
    assert!(!hw.calls.contains(&NetCall::StartHttp));

    let mut mode = portal();
    let mut hw = MockNet {
        fail_http: true,
        ..MockNet::default()
    };
    let err = mode.setup(&mut hw, &mut sys, &mut sink, 0).unwrap_err();
    assert_eq!(err, Error::Net(NetError::HttpStartFailed));
}

#[test]
fn failed_initial_scan_does_not_abort_the_portal() {
    let mut mode = portal();
    let mut hw = MockNet::default();
    hw.blocking_results.push_back(Err(NetError::ScanFailed));
    let mut sys = MockSystem::default();
    let mut sink = EventLog::default();

    mode.setup(&mut hw, &mut sys, &mut sink, 0).unwrap();

    // DNS and HTTP still came up; /networks degrades to the empty list.
    assert!(hw.dns_started_with().is_some());
    assert!(hw.calls.contains(&NetCall::StartHttp));
}

#[test]
fn tick_services_dns_then_http_then_scan() {
    let mut mode = portal();
    let mut hw = MockNet::default();
    let mut bus = MockBus::default();
    let mut registry = DeviceRegistry::new();
    let mut store = MockStore::default();
    let mut sys = MockSystem::default();
    let mut sink = EventLog::default();

    mode.setup(&mut hw, &mut sys, &mut sink, 0).unwrap();

    // Quiet tick inside the rescan interval: DNS slot, then HTTP slot.
    hw.calls.clear();
    mode.tick(&mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink, 100);
    assert_eq!(hw.calls, [NetCall::ProcessDns, NetCall::PollHttp]);

    // The interval elapses: the rescan starts after the DNS and HTTP slots.
    hw.calls.clear();
    mode.tick(
        &mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink,
        RESCAN_INTERVAL_MS,
    );
    assert_eq!(
        hw.calls,
        [NetCall::ProcessDns, NetCall::PollHttp, NetCall::StartScan]
    );

    // With a scan in flight the poll slot shows up, and no second start.
    hw.calls.clear();
    mode.tick(
        &mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink,
        RESCAN_INTERVAL_MS + 10,
    );
    assert_eq!(
        hw.calls,
        [NetCall::ProcessDns, NetCall::PollHttp, NetCall::PollScan]
    );
}

#[test]
fn heart_and_networks_are_served_from_the_portal() {
    let mut mode = portal();
    let mut hw = MockNet::default();
    hw.blocking_results.push_back(Ok(vec![net("shed", -48)]));
    let mut bus = MockBus::default();
    let mut registry = DeviceRegistry::new();
    let mut store = MockStore::default();
    let mut sys = MockSystem::default();
    let mut sink = EventLog::default();

    mode.setup(&mut hw, &mut sys, &mut sink, 0).unwrap();

    hw.inject(HttpMethod::Get, "/heart", b"");
    mode.tick(&mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink, 10);
    let heart = hw.last_response().unwrap();
    assert_eq!(heart.status, 200);
    assert_eq!(heart.body, "{\"heart\":\"beat\"}");

    hw.inject(HttpMethod::Get, "/networks", b"");
    mode.tick(&mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink, 20);
    let networks = hw.last_response().unwrap();
    assert_eq!(networks.status, 200);
    assert!(networks.body.contains("\"shed\""));
    assert!(networks.body.contains("\"wpa2\""));
}

#[test]
fn provisioning_round_trip_saves_then_restarts_after_grace() {
    let mut mode = portal();
    let mut hw = MockNet::default();
    let mut bus = MockBus::default();
    let mut registry = DeviceRegistry::new();
    let mut store = MockStore::default();
    let mut sys = MockSystem::default();
    let mut sink = EventLog::default();

    mode.setup(&mut hw, &mut sys, &mut sink, 0).unwrap();

    // The UI submits a valid configuration.
    hw.inject(HttpMethod::Put, "/config", GOOD_BODY);
    mode.tick(&mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink, 1_000);

    let ack = hw.last_response().unwrap();
    assert_eq!(ack.status, 200);
    assert_eq!(ack.body, "{\"success\":true}");
    assert!(
        ack.extra_headers
            .contains(&("Access-Control-Allow-Origin", "*"))
    );

    let saved = store.saved.clone().expect("config should be persisted");
    assert_eq!(saved.hostname, "kitchen-lamp");
    assert_eq!(saved.wifi_ssid, "shed");
    assert_eq!(saved.boot_mode, BootTarget::Normal);
    assert!(saved.configured);

    // The acknowledgement gets a grace period to leave the device.
    assert_eq!(sys.restarts, 0);
    mode.tick(
        &mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink,
        1_000 + RESTART_GRACE_MS - 1,
    );
    assert_eq!(sys.restarts, 0);

    mode.tick(
        &mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink,
        1_000 + RESTART_GRACE_MS,
    );
    assert_eq!(sys.restarts, 1);
    assert_eq!(sys.flushes, 1);
    assert_eq!(
        sink.0,
        [DeviceEvent::ConfigurationMode, DeviceEvent::AboutToReset]
    );
}

#[test]
fn rejected_config_leaves_the_store_untouched() {
    let mut mode = portal();
    let mut hw = MockNet::default();
    let mut bus = MockBus::default();
    let mut registry = DeviceRegistry::new();
    let mut store = MockStore::default();
    let mut sys = MockSystem::default();
    let mut sink = EventLog::default();

    mode.setup(&mut hw, &mut sys, &mut sink, 0).unwrap();

    hw.inject(HttpMethod::Put, "/config", b"{not json");
    mode.tick(&mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink, 100);
    assert_eq!(hw.last_response().unwrap().status, 400);

    hw.inject(
        HttpMethod::Put,
        "/config",
        br#"{"name":"-bad-","wifi_ssid":"s","wifi_password":"","homie_host":"h"}"#,
    );
    mode.tick(&mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink, 200);
    assert_eq!(hw.last_response().unwrap().status, 400);

    assert_eq!(store.saves, 0);
    assert!(store.saved.is_none());
    // No restart was scheduled by either rejection.
    mode.tick(&mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink, 10_000);
    assert_eq!(sys.restarts, 0);
}

#[test]
fn store_failure_surfaces_as_server_error_without_restart() {
    let mut mode = portal();
    let mut hw = MockNet::default();
    let mut bus = MockBus::default();
    let mut registry = DeviceRegistry::new();
    let mut store = MockStore {
        fail_save: true,
        ..MockStore::default()
    };
    let mut sys = MockSystem::default();
    let mut sink = EventLog::default();

    mode.setup(&mut hw, &mut sys, &mut sink, 0).unwrap();

    hw.inject(HttpMethod::Put, "/config", GOOD_BODY);
    mode.tick(&mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink, 100);

    assert_eq!(hw.last_response().unwrap().status, 500);
    mode.tick(&mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink, 10_000);
    assert_eq!(sys.restarts, 0);
}

#[test]
fn background_rescan_refreshes_the_networks_document() {
    let mut mode = portal();
    let mut hw = MockNet::default();
    hw.blocking_results.push_back(Ok(vec![net("shed", -48)]));
    let mut bus = MockBus::default();
    let mut registry = DeviceRegistry::new();
    let mut store = MockStore::default();
    let mut sys = MockSystem::default();
    let mut sink = EventLog::default();

    mode.setup(&mut hw, &mut sys, &mut sink, 0).unwrap();

    // The rescan starts once the interval since the initial sweep elapses.
    mode.tick(
        &mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink,
        RESCAN_INTERVAL_MS,
    );
    assert_eq!(hw.scan_starts(), 1);

    // While it runs, /networks still serves the previous document.
    hw.inject(HttpMethod::Get, "/networks", b"");
    mode.tick(
        &mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink,
        RESCAN_INTERVAL_MS + 10,
    );
    assert!(hw.last_response().unwrap().body.contains("\"shed\""));

    // Completion swaps the cache; the next read sees the new neighbourhood.
    hw.scan_polls.push_back(ScanPoll::Complete(vec![net("barn", -60)]));
    mode.tick(
        &mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink,
        RESCAN_INTERVAL_MS + 20,
    );
    hw.inject(HttpMethod::Get, "/networks", b"");
    mode.tick(
        &mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink,
        RESCAN_INTERVAL_MS + 30,
    );
    let body = &hw.last_response().unwrap().body;
    assert!(body.contains("\"barn\""));
    assert!(!body.contains("\"shed\""));
}

#[test]
fn failed_rescan_degrades_to_the_empty_list() {
    let mut mode = portal();
    let mut hw = MockNet::default();
    hw.blocking_results.push_back(Ok(vec![net("shed", -48)]));
    let mut bus = MockBus::default();
    let mut registry = DeviceRegistry::new();
    let mut store = MockStore::default();
    let mut sys = MockSystem::default();
    let mut sink = EventLog::default();

    mode.setup(&mut hw, &mut sys, &mut sink, 0).unwrap();
    mode.tick(
        &mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink,
        RESCAN_INTERVAL_MS,
    );
    hw.scan_polls.push_back(ScanPoll::Failed);
    mode.tick(
        &mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink,
        RESCAN_INTERVAL_MS + 10,
    );

    hw.inject(HttpMethod::Get, "/networks", b"");
    mode.tick(
        &mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink,
        RESCAN_INTERVAL_MS + 20,
    );
    assert_eq!(hw.last_response().unwrap().body, EMPTY_NETWORKS_DOC);

    // The portal itself is unaffected.
    hw.inject(HttpMethod::Get, "/heart", b"");
    mode.tick(
        &mut hw, &mut bus, &mut registry, &mut store, &mut sys, &mut sink,
        RESCAN_INTERVAL_MS + 30,
    );
    assert_eq!(hw.last_response().unwrap().body, "{\"heart\":\"beat\"}");
}
