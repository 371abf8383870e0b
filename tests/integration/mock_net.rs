//! Shared scripted doubles for the integration stories.
//!
//! `MockNet` records every port call in order and plays back scripted
//! outcomes, so a test can assert both what the boot modes did and in
//! which sequence. `MockStore`, `MockBus`, `MockSystem` and `EventLog`
//! are the matching doubles for the remaining ports.

use core::net::Ipv4Addr;
use std::collections::VecDeque;

use homie32::boot::scan::NetworkRecord;
use homie32::config::PersistedConfig;
use homie32::events::{DeviceEvent, EventSink};
use homie32::ports::{
    AccessPointPort, CaptiveDnsPort, ConfigPort, HttpMethod, HttpRequest, HttpResponse,
    InboundMessage, NetError, PortalHttpPort, PubSubPort, ResetInputPort, ScanPoll, StationPort,
    StoreError, SystemPort, WifiScanPort,
};

/// One recorded port call, in the order the mode issued it.
#[derive(Debug, Clone, PartialEq)]
pub enum NetCall {
    StartAp {
        ssid: String,
        gateway: Ipv4Addr,
        netmask: Ipv4Addr,
    },
    BlockingScan,
    StartDns {
        addr: Ipv4Addr,
        ttl_secs: u32,
    },
    StartHttp,
    ProcessDns,
    PollHttp,
    StartScan,
    PollScan,
    SetHostname(String),
    Join {
        ssid: String,
        password: String,
    },
    PollStation,
}

/// Scripted network hardware. Empty scripts mean "succeed with defaults":
/// blocking scans find nothing, async scans report `Running` forever.
pub struct MockNet {
    pub calls: Vec<NetCall>,
    pub blocking_results: VecDeque<Result<Vec<NetworkRecord>, NetError>>,
    pub start_scan_results: VecDeque<Result<(), NetError>>,
    pub scan_polls: VecDeque<ScanPoll>,
    pub fail_ap: bool,
    pub fail_dns: bool,
    pub fail_http: bool,
    pub fail_join: bool,
    /// Requests handed out by `next_request`, one per tick.
    pub requests: VecDeque<HttpRequest>,
    /// Responses the mode sent back, in order.
    pub responses: Vec<HttpResponse>,
    /// Raw reset input level. Idles high through the pull-up.
    pub reset_level: bool,
    pub joined: bool,
}

impl Default for MockNet {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            blocking_results: VecDeque::new(),
            start_scan_results: VecDeque::new(),
            scan_polls: VecDeque::new(),
            fail_ap: false,
            fail_dns: false,
            fail_http: false,
            fail_join: false,
            requests: VecDeque::new(),
            responses: Vec::new(),
            reset_level: true,
            joined: false,
        }
    }
}

#[allow(dead_code)]
impl MockNet {
    pub fn inject(&mut self, method: HttpMethod, path: &str, body: &[u8]) {
        self.requests.push_back(HttpRequest {
            method,
            path: path.to_owned(),
            body: body.to_vec(),
        });
    }

    pub fn last_response(&self) -> Option<&HttpResponse> {
        self.responses.last()
    }

    pub fn ap_started_as(&self) -> Option<(&str, Ipv4Addr, Ipv4Addr)> {
        self.calls.iter().find_map(|c| match c {
            NetCall::StartAp {
                ssid,
                gateway,
                netmask,
            } => Some((ssid.as_str(), *gateway, *netmask)),
            _ => None,
        })
    }

    pub fn dns_started_with(&self) -> Option<(Ipv4Addr, u32)> {
        self.calls.iter().find_map(|c| match c {
            NetCall::StartDns { addr, ttl_secs } => Some((*addr, *ttl_secs)),
            _ => None,
        })
    }

    pub fn scan_starts(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, NetCall::StartScan))
            .count()
    }

    pub fn last_join(&self) -> Option<(&str, &str)> {
        self.calls.iter().rev().find_map(|c| match c {
            NetCall::Join { ssid, password } => Some((ssid.as_str(), password.as_str())),
            _ => None,
        })
    }

    pub fn hostname_set_to(&self) -> Option<&str> {
        self.calls.iter().rev().find_map(|c| match c {
            NetCall::SetHostname(name) => Some(name.as_str()),
            _ => None,
        })
    }
}

impl AccessPointPort for MockNet {
    fn start_access_point(
        &mut self,
        ssid: &str,
        gateway: Ipv4Addr,
        netmask: Ipv4Addr,
    ) -> Result<(), NetError> {
        self.calls.push(NetCall::StartAp {
            ssid: ssid.to_owned(),
            gateway,
            netmask,
        });
        if self.fail_ap {
            return Err(NetError::ApStartFailed);
        }
        Ok(())
    }
}

impl CaptiveDnsPort for MockNet {
    fn start_captive_dns(&mut self, addr: Ipv4Addr, ttl_secs: u32) -> Result<(), NetError> {
        self.calls.push(NetCall::StartDns { addr, ttl_secs });
        if self.fail_dns {
            return Err(NetError::DnsStartFailed);
        }
        Ok(())
    }

    fn process_dns_request(&mut self) {
        self.calls.push(NetCall::ProcessDns);
    }
}

impl PortalHttpPort for MockNet {
    fn start_http(&mut self) -> Result<(), NetError> {
        self.calls.push(NetCall::StartHttp);
        if self.fail_http {
            return Err(NetError::HttpStartFailed);
        }
        Ok(())
    }

    fn next_request(&mut self) -> Option<HttpRequest> {
        self.calls.push(NetCall::PollHttp);
        self.requests.pop_front()
    }

    fn send_response(&mut self, response: HttpResponse) {
        self.responses.push(response);
    }
}

impl WifiScanPort for MockNet {
    fn scan_networks_blocking(&mut self) -> Result<Vec<NetworkRecord>, NetError> {
        self.calls.push(NetCall::BlockingScan);
        self.blocking_results.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    fn start_scan(&mut self) -> Result<(), NetError> {
        self.calls.push(NetCall::StartScan);
        self.start_scan_results.pop_front().unwrap_or(Ok(()))
    }

    fn poll_scan(&mut self) -> ScanPoll {
        self.calls.push(NetCall::PollScan);
        self.scan_polls.pop_front().unwrap_or(ScanPoll::Running)
    }
}

impl StationPort for MockNet {
    fn set_hostname(&mut self, hostname: &str) {
        self.calls.push(NetCall::SetHostname(hostname.to_owned()));
    }

    fn join(&mut self, ssid: &str, password: &str) -> Result<(), NetError> {
        self.calls.push(NetCall::Join {
            ssid: ssid.to_owned(),
            password: password.to_owned(),
        });
        if self.fail_join {
            return Err(NetError::JoinFailed);
        }
        Ok(())
    }

    fn poll_station(&mut self) {
        self.calls.push(NetCall::PollStation);
    }

    fn is_joined(&self) -> bool {
        self.joined
    }
}

impl ResetInputPort for MockNet {
    fn read_reset_input(&mut self) -> bool {
        self.reset_level
    }
}

/// In-memory configuration store with a scriptable save failure.
#[derive(Default)]
pub struct MockStore {
    pub saved: Option<PersistedConfig>,
    pub fail_save: bool,
    pub saves: usize,
}

impl ConfigPort for MockStore {
    fn load(&self) -> Result<PersistedConfig, StoreError> {
        self.saved.clone().ok_or(StoreError::NotFound)
    }

    fn save(&mut self, config: &PersistedConfig) -> Result<(), StoreError> {
        if self.fail_save {
            return Err(StoreError::IoError);
        }
        self.saves += 1;
        self.saved = Some(config.clone());
        Ok(())
    }
}

/// Recording broker double with injectable inbound traffic.
#[derive(Default)]
pub struct MockBus {
    pub connected: bool,
    pub connect_calls: Vec<(String, String)>,
    pub published: Vec<(String, String, u8, bool)>,
    pub subscriptions: Vec<String>,
    pub inbound: VecDeque<InboundMessage>,
}

#[allow(dead_code)]
impl MockBus {
    pub fn inject_set(&mut self, topic: &str, payload: &str) {
        self.inbound.push_back(InboundMessage {
            topic: topic.to_owned(),
            payload: payload.to_owned(),
        });
    }

    pub fn published_topics(&self) -> Vec<&str> {
        self.published.iter().map(|(t, ..)| t.as_str()).collect()
    }

    pub fn payload_of(&self, topic: &str) -> Option<&str> {
        self.published
            .iter()
            .rev()
            .find_map(|(t, payload, ..)| (t == topic).then_some(payload.as_str()))
    }
}

impl PubSubPort for MockBus {
    fn connect_broker(&mut self, host: &str, client_id: &str) -> Result<(), NetError> {
        self.connect_calls
            .push((host.to_owned(), client_id.to_owned()));
        Ok(())
    }

    fn is_broker_connected(&self) -> bool {
        self.connected
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: &str,
        qos: u8,
        retained: bool,
    ) -> Result<(), NetError> {
        self.published
            .push((topic.to_owned(), payload.to_owned(), qos, retained));
        Ok(())
    }

    fn subscribe(&mut self, filter: &str, qos: u8) -> Result<(), NetError> {
        let _ = qos;
        self.subscriptions.push(filter.to_owned());
        Ok(())
    }

    fn poll_inbound(&mut self) -> Option<InboundMessage> {
        self.inbound.pop_front()
    }
}

/// System double. Counts instead of acting.
#[derive(Default)]
pub struct MockSystem {
    pub restarts: usize,
    pub flushes: usize,
    pub led: Option<bool>,
}

impl SystemPort for MockSystem {
    fn restart(&mut self) {
        self.restarts += 1;
    }

    fn restart_requested(&self) -> bool {
        self.restarts > 0
    }

    fn flush_output(&mut self) {
        self.flushes += 1;
    }

    fn set_status_led(&mut self, on: bool) {
        self.led = Some(on);
    }
}

/// Event recorder.
#[derive(Default)]
pub struct EventLog(pub Vec<DeviceEvent>);

#[allow(dead_code)]
impl EventLog {
    pub fn contains(&self, event: DeviceEvent) -> bool {
        self.0.contains(&event)
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, event: DeviceEvent) {
        self.0.push(event);
    }
}
