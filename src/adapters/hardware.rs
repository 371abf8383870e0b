//! Device hardware aggregate.
//!
//! Owns the radio, the captive DNS responder, the portal HTTP server
//! and the reset input, exposing them through the port traits the boot
//! modes consume. The [`crate::ports::BootHardware`] blanket bound is
//! satisfied by this one type, so the composition root hands a single
//! `&mut` to the lifecycle.
//!
//! The reset input is the BOOT button, configured as a pulled-up GPIO
//! at construction and sampled raw; debouncing happens in the trigger,
//! not here.

use crate::adapters::dns::CaptiveDnsServer;
use crate::adapters::httpd::PortalHttpServer;
use crate::adapters::wifi::WifiAdapter;
use crate::boot::scan::NetworkRecord;
use crate::ports::{
    AccessPointPort, CaptiveDnsPort, HttpRequest, HttpResponse, NetError, PortalHttpPort,
    ResetInputPort, ScanPoll, StationPort, WifiScanPort,
};

#[cfg(target_os = "espidf")]
use crate::pins;
#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
#[cfg(target_os = "espidf")]
use log::warn;

pub struct DeviceHardware {
    wifi: WifiAdapter,
    dns: CaptiveDnsServer,
    http: PortalHttpServer,
    #[cfg(not(target_os = "espidf"))]
    sim_reset_level: bool,
}

impl DeviceHardware {
    pub fn new(wifi: WifiAdapter, dns: CaptiveDnsServer, http: PortalHttpServer) -> Self {
        #[cfg(target_os = "espidf")]
        {
            let cfg = gpio_config_t {
                pin_bit_mask: 1u64 << pins::RESET_BUTTON_GPIO,
                mode: gpio_mode_t_GPIO_MODE_INPUT,
                pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
                pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
                intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
            };
            // SAFETY: plain register configuration of a dedicated input pin.
            let ret = unsafe { gpio_config(&cfg) };
            if ret != ESP_OK {
                warn!("reset input: gpio_config failed: rc={ret}");
            }
        }

        Self {
            wifi,
            dns,
            http,
            #[cfg(not(target_os = "espidf"))]
            sim_reset_level: true,
        }
    }

    /// Drive the simulated reset input; `false` plays a pressed BOOT
    /// button (the line idles high through the pull-up).
    #[cfg(not(target_os = "espidf"))]
    pub fn set_reset_level(&mut self, level: bool) {
        self.sim_reset_level = level;
    }
}

// ── AccessPointPort ───────────────────────────────────────────

impl AccessPointPort for DeviceHardware {
    fn start_access_point(
        &mut self,
        ssid: &str,
        gateway: core::net::Ipv4Addr,
        netmask: core::net::Ipv4Addr,
    ) -> Result<(), NetError> {
        self.wifi.start_access_point(ssid, gateway, netmask)
    }
}

// ── CaptiveDnsPort ────────────────────────────────────────────

impl CaptiveDnsPort for DeviceHardware {
    fn start_captive_dns(
        &mut self,
        portal_addr: core::net::Ipv4Addr,
        ttl_secs: u32,
    ) -> Result<(), NetError> {
        self.dns.start_captive_dns(portal_addr, ttl_secs)
    }

    fn process_dns_request(&mut self) {
        self.dns.process_dns_request();
    }
}

// ── PortalHttpPort ────────────────────────────────────────────

impl PortalHttpPort for DeviceHardware {
    fn start_http(&mut self) -> Result<(), NetError> {
        self.http.start_http()
    }

    fn next_request(&mut self) -> Option<HttpRequest> {
        self.http.next_request()
    }

    fn send_response(&mut self, response: HttpResponse) {
        self.http.send_response(response);
    }
}

// ── WifiScanPort ──────────────────────────────────────────────

impl WifiScanPort for DeviceHardware {
    fn scan_networks_blocking(&mut self) -> Result<Vec<NetworkRecord>, NetError> {
        self.wifi.scan_networks_blocking()
    }

    fn start_scan(&mut self) -> Result<(), NetError> {
        self.wifi.start_scan()
    }

    fn poll_scan(&mut self) -> ScanPoll {
        self.wifi.poll_scan()
    }
}

// ── StationPort ───────────────────────────────────────────────

impl StationPort for DeviceHardware {
    fn set_hostname(&mut self, hostname: &str) {
        self.wifi.set_hostname(hostname);
    }

    fn join(&mut self, ssid: &str, password: &str) -> Result<(), NetError> {
        self.wifi.join(ssid, password)
    }

    fn poll_station(&mut self) {
        self.wifi.poll_station();
    }

    fn is_joined(&self) -> bool {
        self.wifi.is_joined()
    }
}

// ── ResetInputPort ────────────────────────────────────────────

impl ResetInputPort for DeviceHardware {
    #[cfg(target_os = "espidf")]
    fn read_reset_input(&mut self) -> bool {
        // SAFETY: pin was configured as input in `new`.
        unsafe { gpio_get_level(pins::RESET_BUTTON_GPIO) != 0 }
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_reset_input(&mut self) -> bool {
        self.sim_reset_level
    }
}
