//! Configuration mode: the captive provisioning portal.
//!
//! Brings up an open access point named after the device, a catch-all DNS
//! responder so any URL lands on the portal, and a three-endpoint HTTP
//! surface (`/heart`, `/networks`, `/config`). A valid `PUT /config` is
//! persisted, acknowledged, and followed by a restart after a short grace
//! period so the acknowledgement can reach the peer first.

use core::net::Ipv4Addr;

use log::{error, info, warn};

use crate::boot::scan::NetworkScanner;
use crate::config::{BootTarget, PersistedConfig};
use crate::error::Error;
use crate::events::{DeviceEvent, EventSink};
use crate::ports::{
    AccessPointPort, CaptiveDnsPort, ConfigPort, HttpMethod, HttpRequest, HttpResponse,
    PortalHttpPort, SystemPort, WifiScanPort,
};
use crate::validate::validate_config_document;

/// The device's own address while the portal runs; DNS resolves every name
/// to it and clients receive addresses from the same /24.
pub const PORTAL_GATEWAY: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 1);
pub const PORTAL_NETMASK: Ipv4Addr = Ipv4Addr::new(255, 255, 255, 0);

/// TTL for the catch-all DNS answers.
pub const DNS_TTL_SECS: u32 = 300;

/// Delay between acknowledging a new configuration and restarting, so the
/// response has time to leave the device.
pub const RESTART_GRACE_MS: u64 = 1_000;

const HEARTBEAT_BODY: &str = "{\"heart\":\"beat\"}";
const CONFIG_OK_BODY: &str = "{\"success\":true}";

/// Preflight answer for the cross-origin provisioning UI.
const CORS_PREFLIGHT_HEADERS: &[(&str, &str)] = &[
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "PUT"),
    ("Access-Control-Allow-Headers", "Content-Type, Origin, Accept"),
];

/// Actual `/config` responses only need the origin grant.
const CORS_ORIGIN_HEADER: &[(&str, &str)] = &[("Access-Control-Allow-Origin", "*")];

/// Configuration-mode state. One instance lives for the whole boot.
#[derive(Debug)]
pub struct BootConfig {
    ap_ssid: heapless::String<32>,
    scanner: NetworkScanner,
    restart_at_ms: Option<u64>,
}

impl BootConfig {
    pub fn new(ap_ssid: heapless::String<32>) -> Self {
        Self {
            ap_ssid,
            scanner: NetworkScanner::new(),
            restart_at_ms: None,
        }
    }

    /// Bring up AP, scan cache, DNS and HTTP. Any failure aborts the boot.
    pub fn setup(
        &mut self,
        hw: &mut (impl AccessPointPort + CaptiveDnsPort + PortalHttpPort + WifiScanPort),
        sys: &mut impl SystemPort,
        sink: &mut impl EventSink,
        now_ms: u64,
    ) -> Result<(), Error> {
        info!("booting into configuration mode");
        sink.emit(DeviceEvent::ConfigurationMode);
        sys.set_status_led(true);

        hw.start_access_point(&self.ap_ssid, PORTAL_GATEWAY, PORTAL_NETMASK)?;
        info!("access point '{}' up at {}", self.ap_ssid, PORTAL_GATEWAY);

        // The radio returns nothing if asked to scan before the AP is
        // active, so the first sweep is synchronous and happens here.
        self.scanner.initial_scan(hw, now_ms);

        hw.start_captive_dns(PORTAL_GATEWAY, DNS_TTL_SECS)?;
        hw.start_http()?;
        info!("captive portal ready");
        Ok(())
    }

    /// One cooperative slice: DNS, then HTTP, then scan progress, then the
    /// rescan timer, then the pending-restart deadline.
    pub fn tick(
        &mut self,
        hw: &mut (impl CaptiveDnsPort + PortalHttpPort + WifiScanPort),
        store: &mut impl ConfigPort,
        sys: &mut impl SystemPort,
        sink: &mut impl EventSink,
        now_ms: u64,
    ) {
        hw.process_dns_request();

        if let Some(request) = hw.next_request() {
            let response = self.handle_request(&request, store, now_ms);
            hw.send_response(response);
        }

        self.scanner.poll_completion(hw);
        self.scanner.maybe_start_scan(hw, now_ms);

        if self.restart_due(now_ms) {
            info!("restarting into normal mode");
            sink.emit(DeviceEvent::AboutToReset);
            sys.flush_output();
            sys.restart();
        }
    }

    /// True once a restart is scheduled, for observers.
    pub fn restart_pending(&self) -> bool {
        self.restart_at_ms.is_some()
    }

    fn restart_due(&self, now_ms: u64) -> bool {
        self.restart_at_ms.is_some_and(|at| now_ms >= at)
    }

    fn handle_request(
        &mut self,
        request: &HttpRequest,
        store: &mut impl ConfigPort,
        now_ms: u64,
    ) -> HttpResponse {
        match (request.method, request.path.as_str()) {
            (HttpMethod::Get, "/heart") => HttpResponse::json(HEARTBEAT_BODY.to_owned()),
            (HttpMethod::Get, "/networks") => {
                HttpResponse::json(self.scanner.cached_document().to_owned())
            }
            (HttpMethod::Options, "/config") => {
                HttpResponse::empty(200).with_headers(CORS_PREFLIGHT_HEADERS)
            }
            (HttpMethod::Put, "/config") => self
                .handle_config_put(&request.body, store, now_ms)
                .with_headers(CORS_ORIGIN_HEADER),
            _ => {
                warn!(
                    "portal: no route for {:?} {}",
                    request.method, request.path
                );
                HttpResponse::empty(404)
            }
        }
    }

    fn handle_config_put(
        &mut self,
        body: &[u8],
        store: &mut impl ConfigPort,
        now_ms: u64,
    ) -> HttpResponse {
        let doc: serde_json::Value = match serde_json::from_slice(body) {
            Ok(doc) => doc,
            Err(_) => {
                warn!("configuration rejected: body is not valid JSON");
                return HttpResponse::empty(400);
            }
        };

        let update = match validate_config_document(&doc) {
            Ok(update) => update,
            Err(reason) => {
                warn!("configuration rejected: {reason}");
                return HttpResponse::empty(400);
            }
        };

        let config = PersistedConfig {
            hostname: update.name,
            wifi_ssid: update.wifi_ssid,
            wifi_password: update.wifi_password,
            homie_host: update.homie_host,
            boot_mode: BootTarget::Normal,
            configured: true,
        };

        if let Err(e) = store.save(&config) {
            error!("could not persist configuration: {e}");
            return HttpResponse::empty(500);
        }

        info!("configuration saved, device name '{}'", config.hostname);
        self.restart_at_ms = Some(now_ms + RESTART_GRACE_MS);
        HttpResponse::json(CONFIG_OK_BODY.to_owned())
    }
}
