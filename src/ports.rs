//! Port traits: the hexagonal boundary between lifecycle logic and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ BootMode (domain)
//! ```
//!
//! Driven adapters (Wi-Fi radio, DNS/HTTP servers, broker client, NVS,
//! system control) implement these traits. The boot modes consume them via
//! generics, so the lifecycle core never touches ESP-IDF directly.
//!
//! ## Tick discipline
//!
//! Every method here is called from the single cooperative tick loop.
//! Implementations MUST NOT block: "start" methods kick work off, "poll"
//! methods report progress, and anything slow happens inside the platform
//! stack between ticks. The one sanctioned exception is
//! [`WifiScanPort::scan_networks_blocking`], used exactly once during portal
//! bring-up (see the radio quirk documented at the call site).

use crate::boot::scan::NetworkRecord;
use crate::config::PersistedConfig;

// ───────────────────────────────────────────────────────────────
// Access point port (portal bring-up)
// ───────────────────────────────────────────────────────────────

/// Soft-AP control for the provisioning portal.
pub trait AccessPointPort {
    /// Bring up an open access point with the given SSID, with the device
    /// itself at `gateway` on the `netmask` subnet.
    fn start_access_point(
        &mut self,
        ssid: &str,
        gateway: core::net::Ipv4Addr,
        netmask: core::net::Ipv4Addr,
    ) -> Result<(), NetError>;
}

// ───────────────────────────────────────────────────────────────
// Captive DNS port
// ───────────────────────────────────────────────────────────────

/// Catch-all DNS responder that redirects every lookup to the portal.
pub trait CaptiveDnsPort {
    /// Start answering on UDP port 53. Every A-record query resolves to
    /// `portal_addr` with the given TTL; queries that cannot be resolved are
    /// answered with a SERVFAIL error response rather than dropped.
    fn start_captive_dns(
        &mut self,
        portal_addr: core::net::Ipv4Addr,
        ttl_secs: u32,
    ) -> Result<(), NetError>;

    /// Service at most one pending DNS query. Must return immediately when
    /// none is waiting.
    fn process_dns_request(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Portal HTTP port (poll model)
// ───────────────────────────────────────────────────────────────

/// Minimal HTTP server surface for the portal endpoints.
///
/// Request parsing, sockets and keep-alive belong to the adapter; the
/// domain sees one fully-read request at a time and answers it with
/// [`PortalHttpPort::send_response`] before the next
/// [`PortalHttpPort::next_request`] call.
pub trait PortalHttpPort {
    /// Start listening on TCP port 80.
    fn start_http(&mut self) -> Result<(), NetError>;

    /// Pop the next fully-received request, if any. Never blocks.
    fn next_request(&mut self) -> Option<HttpRequest>;

    /// Answer the request most recently returned by `next_request`.
    fn send_response(&mut self, response: HttpResponse);
}

/// Methods the portal distinguishes. Everything else routes to not-found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Put,
    Options,
    Other,
}

/// One fully-received portal request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Path component only, e.g. `/networks`. No query strings in this API.
    pub path: String,
    pub body: Vec<u8>,
}

/// The domain's answer to a portal request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
    /// Additional headers, e.g. the CORS preflight set.
    pub extra_headers: &'static [(&'static str, &'static str)],
}

impl HttpResponse {
    /// 200 with a JSON body.
    pub fn json(body: String) -> Self {
        Self {
            status: 200,
            content_type: "application/json",
            body,
            extra_headers: &[],
        }
    }

    /// Status-only response with an empty body.
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: String::new(),
            extra_headers: &[],
        }
    }

    pub fn with_headers(mut self, headers: &'static [(&'static str, &'static str)]) -> Self {
        self.extra_headers = headers;
        self
    }
}

// ───────────────────────────────────────────────────────────────
// Wi-Fi scan port
// ───────────────────────────────────────────────────────────────

/// Network scanning, both the one-off blocking form and the non-blocking
/// start/poll pair driven by the scan state machine.
pub trait WifiScanPort {
    /// Run a full scan to completion and return the visible networks.
    /// Blocking; only valid during portal bring-up.
    fn scan_networks_blocking(&mut self) -> Result<Vec<NetworkRecord>, NetError>;

    /// Kick off a non-blocking scan.
    fn start_scan(&mut self) -> Result<(), NetError>;

    /// Report progress of the scan started by `start_scan`.
    fn poll_scan(&mut self) -> ScanPoll;
}

/// Progress of an in-flight scan.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanPoll {
    /// Still running; ask again next tick.
    Running,
    /// Finished with the networks found (possibly none).
    Complete(Vec<NetworkRecord>),
    /// The radio gave up; no results.
    Failed,
}

// ───────────────────────────────────────────────────────────────
// Station port (normal mode)
// ───────────────────────────────────────────────────────────────

/// Client-side Wi-Fi association for normal mode.
pub trait StationPort {
    /// Set the DHCP hostname announced on join. Call before `join`.
    fn set_hostname(&mut self, hostname: &str);

    /// Begin associating with the given network. Returns once the attempt
    /// is started; completion is observed through `is_joined`.
    fn join(&mut self, ssid: &str, password: &str) -> Result<(), NetError>;

    /// Drive reconnect bookkeeping. Call every tick while in normal mode.
    fn poll_station(&mut self);

    /// True while associated with an IP address assigned.
    fn is_joined(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Pub/sub port (broker client)
// ───────────────────────────────────────────────────────────────

/// Publish/subscribe wire client. Connection management and retransmission
/// live in the adapter; the domain publishes, subscribes and drains inbound
/// messages.
pub trait PubSubPort {
    /// Begin connecting to the broker. Completion is observed through
    /// `is_broker_connected`.
    fn connect_broker(&mut self, host: &str, client_id: &str) -> Result<(), NetError>;

    /// True while the broker session is established.
    fn is_broker_connected(&self) -> bool;

    /// Publish one message.
    fn publish(&mut self, topic: &str, payload: &str, qos: u8, retained: bool)
    -> Result<(), NetError>;

    /// Subscribe to a topic filter.
    fn subscribe(&mut self, filter: &str, qos: u8) -> Result<(), NetError>;

    /// Pop the next inbound message on a subscribed topic, if any.
    fn poll_inbound(&mut self) -> Option<InboundMessage>;
}

/// One inbound pub/sub message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: String,
}

// ───────────────────────────────────────────────────────────────
// Configuration port (domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the device configuration.
///
/// Implementations MUST validate before persisting: a record claiming
/// `configured` with missing credentials or a topic-unsafe hostname is
/// rejected with [`StoreError::ValidationFailed`], never written. Writes are
/// all-or-nothing; a failed save leaves the previous record intact.
pub trait ConfigPort {
    /// Load the stored configuration.
    /// Returns [`StoreError::NotFound`] on a factory-fresh device.
    fn load(&self) -> Result<PersistedConfig, StoreError>;

    /// Validate and persist the configuration atomically.
    fn save(&mut self, config: &PersistedConfig) -> Result<(), StoreError>;
}

// ───────────────────────────────────────────────────────────────
// System port (restart, output flush, status LED)
// ───────────────────────────────────────────────────────────────

/// Last-resort system operations the lifecycle needs.
pub trait SystemPort {
    /// Restart the device. On hardware this does not return; host
    /// implementations record the request and let the loop observe it.
    fn restart(&mut self);

    /// True once `restart` has been requested (host implementations only;
    /// on hardware the call never returns).
    fn restart_requested(&self) -> bool;

    /// Flush buffered log output so nothing is lost across a restart.
    fn flush_output(&mut self);

    /// Drive the provisioning status LED.
    fn set_status_led(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Reset input port (debounced trigger source)
// ───────────────────────────────────────────────────────────────

/// Raw reset-trigger input, sampled once per tick by the debouncer.
/// Pin setup happens at adapter construction.
pub trait ResetInputPort {
    /// Current raw logic level of the reset input.
    fn read_reset_input(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Aggregate bound for the boot modes
// ───────────────────────────────────────────────────────────────

/// Everything the boot modes need from the platform, as one bound.
/// Blanket-implemented so any type providing the parts qualifies.
pub trait BootHardware:
    AccessPointPort + CaptiveDnsPort + PortalHttpPort + WifiScanPort + StationPort + ResetInputPort
{
}

impl<T> BootHardware for T where
    T: AccessPointPort
        + CaptiveDnsPort
        + PortalHttpPort
        + WifiScanPort
        + StationPort
        + ResetInputPort
{
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from the network-facing ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetError {
    /// The soft-AP could not be started.
    ApStartFailed,
    /// The captive DNS responder could not be started.
    DnsStartFailed,
    /// The HTTP server could not be started.
    HttpStartFailed,
    /// A scan could not be started or aborted mid-flight.
    ScanFailed,
    /// Station association could not be started.
    JoinFailed,
    /// The broker connection could not be started.
    BrokerConnectFailed,
    /// A publish was not accepted by the transport.
    PublishFailed,
    /// A subscription was not accepted by the transport.
    SubscribeFailed,
    /// Operation requires a connection that is not up.
    NotConnected,
}

impl core::fmt::Display for NetError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ApStartFailed => write!(f, "access point start failed"),
            Self::DnsStartFailed => write!(f, "captive DNS start failed"),
            Self::HttpStartFailed => write!(f, "HTTP server start failed"),
            Self::ScanFailed => write!(f, "scan failed"),
            Self::JoinFailed => write!(f, "join failed"),
            Self::BrokerConnectFailed => write!(f, "broker connect failed"),
            Self::PublishFailed => write!(f, "publish failed"),
            Self::SubscribeFailed => write!(f, "subscribe failed"),
            Self::NotConnected => write!(f, "not connected"),
        }
    }
}

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// The record failed validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for StoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
