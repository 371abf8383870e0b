//! Wi-Fi radio adapter.
//!
//! One `WifiAdapter` owns the modem and backs three ports: the portal
//! access point ([`AccessPointPort`]), network scanning
//! ([`WifiScanPort`]) and the station link ([`StationPort`]).
//!
//! Driver lifecycle goes through the safe `EspWifi` wrapper. Scanning
//! uses the raw `esp_wifi_scan_*` calls so the asynchronous variant can
//! be polled from the tick loop without blocking: a `WIFI_EVENT` handler
//! flips an atomic when `SCAN_DONE` arrives and results are collected on
//! the next poll. The portal runs the radio in AP+STA so scans keep
//! working while the access point is up.
//!
//! On non-ESP targets the adapter simulates a small neighbourhood of
//! networks and an always-successful join, with every call returning
//! immediately.

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::boot::scan::{Encryption, NetworkRecord};
use crate::error::Error;
use crate::ports::{AccessPointPort, NetError, ScanPoll, StationPort, WifiScanPort};

#[cfg(target_os = "espidf")]
use esp_idf_hal::peripherals::Peripherals;
#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    handle::RawHandle,
    ipv4::{Configuration as IpConfiguration, Mask, RouterConfiguration, Subnet},
    netif::{EspNetif, NetifConfiguration},
    nvs::EspDefaultNvsPartition,
    wifi::{AccessPointConfiguration, AuthMethod, ClientConfiguration, Configuration, EspWifi},
};

/// Ticks to wait between reconnect attempts after the link drops.
/// At a 10 ms tick this is roughly five seconds.
const RECONNECT_HOLDOFF_TICKS: u32 = 500;

#[cfg(target_os = "espidf")]
static SCAN_DONE: core::sync::atomic::AtomicBool = core::sync::atomic::AtomicBool::new(false);

/// Minimal `WIFI_EVENT` handler; only watches for scan completion.
/// Runs on the event task, so it must not touch the adapter itself.
#[cfg(target_os = "espidf")]
unsafe extern "C" fn wifi_event_handler(
    _arg: *mut core::ffi::c_void,
    _event_base: esp_event_base_t,
    event_id: i32,
    _event_data: *mut core::ffi::c_void,
) {
    if event_id == wifi_event_t_WIFI_EVENT_SCAN_DONE as i32 {
        SCAN_DONE.store(true, core::sync::atomic::Ordering::SeqCst);
    }
}

pub struct WifiAdapter {
    #[cfg(target_os = "espidf")]
    wifi: EspWifi<'static>,
    #[cfg(target_os = "espidf")]
    scan_started: bool,
    /// Set once `join` has configured station credentials; gates the
    /// reconnect logic in `poll_station`.
    #[cfg(target_os = "espidf")]
    sta_active: bool,
    #[cfg(target_os = "espidf")]
    reconnect_holdoff: u32,

    #[cfg(not(target_os = "espidf"))]
    sim_scan_pending: bool,
    /// `Some(n)`: joining, `n` polls until the link comes up.
    /// `Some(0)`: joined. `None`: no station configured.
    #[cfg(not(target_os = "espidf"))]
    sim_join_countdown: Option<u8>,
}

impl WifiAdapter {
    /// Take the modem and bring up the Wi-Fi driver (stopped).
    ///
    /// Must be called once; the adapter owns `Peripherals` from here on.
    pub fn new() -> Result<Self, Error> {
        #[cfg(target_os = "espidf")]
        {
            let peripherals =
                Peripherals::take().map_err(|_| Error::Init("peripherals already taken"))?;
            let sysloop =
                EspSystemEventLoop::take().map_err(|_| Error::Init("event loop unavailable"))?;
            let nvs = EspDefaultNvsPartition::take()
                .map_err(|_| Error::Init("NVS partition unavailable"))?;

            let wifi = EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))
                .map_err(|_| Error::Init("wifi driver init failed"))?;

            // SAFETY: the handler only stores to a static atomic, and the
            // default event loop outlives the adapter.
            let ret = unsafe {
                esp_event_handler_register(
                    WIFI_EVENT,
                    ESP_EVENT_ANY_ID,
                    Some(wifi_event_handler),
                    core::ptr::null_mut(),
                )
            };
            if ret != ESP_OK {
                return Err(Error::Init("wifi event handler registration failed"));
            }

            info!("WifiAdapter: driver initialised");
            Ok(Self {
                wifi,
                scan_started: false,
                sta_active: false,
                reconnect_holdoff: 0,
            })
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("WifiAdapter: simulation backend");
            Ok(Self {
                sim_scan_pending: false,
                sim_join_countdown: None,
            })
        }
    }

    // -----------------------------------------------------------------------
    // Platform: ESP-IDF
    // -----------------------------------------------------------------------

    #[cfg(target_os = "espidf")]
    fn platform_start_ap(
        &mut self,
        ssid: &str,
        gateway: core::net::Ipv4Addr,
        netmask: core::net::Ipv4Addr,
    ) -> Result<(), NetError> {
        let ap = AccessPointConfiguration {
            ssid: ssid.try_into().map_err(|()| NetError::ApStartFailed)?,
            auth_method: AuthMethod::None,
            channel: 1,
            max_connections: 4,
            ..Default::default()
        };
        // AP+STA: scanning needs a running station interface.
        self.wifi
            .set_configuration(&Configuration::Mixed(ClientConfiguration::default(), ap))
            .map_err(|e| {
                warn!("wifi: AP configuration rejected: {e}");
                NetError::ApStartFailed
            })?;

        // Re-home the AP interface on the portal subnet before start so
        // DHCP hands out leases with the portal gateway as DNS.
        let prefix = u32::from(netmask).count_ones() as u8;
        let mut netif_conf = NetifConfiguration::wifi_default_router();
        netif_conf.key = "PORTAL_AP".try_into().map_err(|()| NetError::ApStartFailed)?;
        netif_conf.ip_configuration = Some(IpConfiguration::Router(RouterConfiguration {
            subnet: Subnet {
                gateway,
                mask: Mask(prefix),
            },
            dhcp_enabled: true,
            dns: Some(gateway),
            secondary_dns: None,
        }));
        let netif = EspNetif::new_with_conf(&netif_conf).map_err(|e| {
            warn!("wifi: portal netif creation failed: {e}");
            NetError::ApStartFailed
        })?;
        let _old = self.wifi.swap_netif_ap(netif).map_err(|e| {
            warn!("wifi: netif swap failed: {e}");
            NetError::ApStartFailed
        })?;

        self.wifi.start().map_err(|e| {
            warn!("wifi: start failed: {e}");
            NetError::ApStartFailed
        })?;
        info!("wifi: access point '{ssid}' up at {gateway}");
        Ok(())
    }

    /// Scan parameters: all channels, active probing, driver-default
    /// dwell times.
    #[cfg(target_os = "espidf")]
    fn raw_scan_config() -> wifi_scan_config_t {
        wifi_scan_config_t {
            ssid: core::ptr::null_mut(),
            bssid: core::ptr::null_mut(),
            channel: 0,
            show_hidden: false,
            scan_type: wifi_scan_type_t_WIFI_SCAN_TYPE_ACTIVE,
            scan_time: wifi_scan_time_t {
                active: wifi_active_scan_time_t { min: 0, max: 0 },
                passive: 0,
            },
            home_chan_dwell_time: 0,
            channel_bitmap: wifi_scan_channel_bitmap_t {
                ghz_2_channels: 0xFFFF,
                ghz_5_channels: 0,
            },
        }
    }

    #[cfg(target_os = "espidf")]
    fn encryption_from_authmode(mode: wifi_auth_mode_t) -> Encryption {
        match mode {
            wifi_auth_mode_t_WIFI_AUTH_OPEN => Encryption::None,
            wifi_auth_mode_t_WIFI_AUTH_WEP => Encryption::Wep,
            wifi_auth_mode_t_WIFI_AUTH_WPA_PSK => Encryption::Wpa,
            wifi_auth_mode_t_WIFI_AUTH_WPA2_PSK | wifi_auth_mode_t_WIFI_AUTH_WPA2_ENTERPRISE => {
                Encryption::Wpa2
            }
            _ => Encryption::Auto,
        }
    }

    /// Drain the driver's scan result buffer into domain records.
    /// Must be called exactly once per completed scan; the driver frees
    /// its buffer on `esp_wifi_scan_get_ap_records`.
    #[cfg(target_os = "espidf")]
    fn platform_collect_results(&mut self) -> Result<Vec<NetworkRecord>, NetError> {
        let mut count: u16 = 0;
        // SAFETY: driver writes count before returning.
        let ret = unsafe { esp_wifi_scan_get_ap_num(&mut count) };
        if ret != ESP_OK {
            warn!("wifi: scan_get_ap_num failed: rc={ret}");
            return Err(NetError::ScanFailed);
        }
        if count == 0 {
            return Ok(Vec::new());
        }

        // SAFETY: wifi_ap_record_t is plain old data; zeroed is a valid
        // initial state and the driver fills `actual` entries.
        let mut records: Vec<wifi_ap_record_t> =
            vec![unsafe { core::mem::zeroed() }; count as usize];
        let mut actual = count;
        let ret = unsafe { esp_wifi_scan_get_ap_records(&mut actual, records.as_mut_ptr()) };
        if ret != ESP_OK {
            warn!("wifi: scan_get_ap_records failed: rc={ret}");
            return Err(NetError::ScanFailed);
        }
        records.truncate(actual as usize);

        let mut found = Vec::with_capacity(records.len());
        for ap in &records {
            let ssid = core::ffi::CStr::from_bytes_until_nul(&ap.ssid)
                .ok()
                .and_then(|c| c.to_str().ok())
                .unwrap_or("");
            if ssid.is_empty() {
                continue;
            }
            found.push(NetworkRecord {
                ssid: ssid.to_string(),
                rssi: i32::from(ap.rssi),
                encryption: Self::encryption_from_authmode(ap.authmode),
            });
        }
        info!("wifi: scan found {} networks", found.len());
        Ok(found)
    }

    #[cfg(target_os = "espidf")]
    fn platform_scan_blocking(&mut self) -> Result<Vec<NetworkRecord>, NetError> {
        SCAN_DONE.store(false, core::sync::atomic::Ordering::SeqCst);
        let cfg = Self::raw_scan_config();
        // SAFETY: cfg outlives the call; the blocking form returns only
        // after the driver has finished scanning.
        let ret = unsafe { esp_wifi_scan_start(&cfg, true) };
        if ret != ESP_OK {
            warn!("wifi: blocking scan start failed: rc={ret}");
            return Err(NetError::ScanFailed);
        }
        self.platform_collect_results()
    }

    #[cfg(target_os = "espidf")]
    fn platform_scan_start(&mut self) -> Result<(), NetError> {
        SCAN_DONE.store(false, core::sync::atomic::Ordering::SeqCst);
        let cfg = Self::raw_scan_config();
        // SAFETY: the non-blocking start copies cfg before returning.
        let ret = unsafe { esp_wifi_scan_start(&cfg, false) };
        if ret != ESP_OK {
            warn!("wifi: async scan start failed: rc={ret}");
            return Err(NetError::ScanFailed);
        }
        self.scan_started = true;
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_scan_poll(&mut self) -> ScanPoll {
        if !self.scan_started {
            return ScanPoll::Running;
        }
        if !SCAN_DONE.load(core::sync::atomic::Ordering::SeqCst) {
            return ScanPoll::Running;
        }
        self.scan_started = false;
        match self.platform_collect_results() {
            Ok(list) => ScanPoll::Complete(list),
            Err(_) => ScanPoll::Failed,
        }
    }

    #[cfg(target_os = "espidf")]
    fn platform_set_hostname(&mut self, hostname: &str) {
        let mut buf = [0u8; 33];
        let len = hostname.len().min(32);
        buf[..len].copy_from_slice(&hostname.as_bytes()[..len]);
        let handle = self.wifi.sta_netif().handle();
        // SAFETY: buf is NUL-terminated and outlives the call.
        let ret = unsafe { esp_netif_set_hostname(handle, buf.as_ptr() as *const _) };
        if ret != ESP_OK {
            warn!("wifi: set_hostname failed: rc={ret}");
        }
    }

    #[cfg(target_os = "espidf")]
    fn platform_join(&mut self, ssid: &str, password: &str) -> Result<(), NetError> {
        let client = ClientConfiguration {
            ssid: ssid.try_into().map_err(|()| NetError::JoinFailed)?,
            password: password.try_into().map_err(|()| NetError::JoinFailed)?,
            auth_method: if password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            },
            ..Default::default()
        };
        self.wifi
            .set_configuration(&Configuration::Client(client))
            .map_err(|e| {
                warn!("wifi: station configuration rejected: {e}");
                NetError::JoinFailed
            })?;
        if !matches!(self.wifi.is_started(), Ok(true)) {
            self.wifi.start().map_err(|e| {
                warn!("wifi: start failed: {e}");
                NetError::JoinFailed
            })?;
        }
        self.wifi.connect().map_err(|e| {
            warn!("wifi: connect failed: {e}");
            NetError::JoinFailed
        })?;
        self.sta_active = true;
        self.reconnect_holdoff = 0;
        info!("wifi: joining '{ssid}'");
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_poll_station(&mut self) {
        if !self.sta_active {
            return;
        }
        if matches!(self.wifi.is_connected(), Ok(true)) {
            self.reconnect_holdoff = 0;
            return;
        }
        if self.reconnect_holdoff == 0 {
            info!("wifi: link down, reconnecting");
            if let Err(e) = self.wifi.connect() {
                warn!("wifi: reconnect failed: {e}");
            }
            self.reconnect_holdoff = RECONNECT_HOLDOFF_TICKS;
        } else {
            self.reconnect_holdoff -= 1;
        }
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_joined(&self) -> bool {
        self.wifi.sta_netif().is_up().unwrap_or(false)
    }

    // -----------------------------------------------------------------------
    // Platform: simulation
    // -----------------------------------------------------------------------

    #[cfg(not(target_os = "espidf"))]
    fn sim_neighbourhood() -> Vec<NetworkRecord> {
        vec![
            NetworkRecord {
                ssid: "sim-lab".to_string(),
                rssi: -48,
                encryption: Encryption::Wpa2,
            },
            NetworkRecord {
                ssid: "sim-guest".to_string(),
                rssi: -71,
                encryption: Encryption::None,
            },
        ]
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start_ap(
        &mut self,
        ssid: &str,
        gateway: core::net::Ipv4Addr,
        _netmask: core::net::Ipv4Addr,
    ) -> Result<(), NetError> {
        info!("wifi: sim access point '{ssid}' up at {gateway}");
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_scan_blocking(&mut self) -> Result<Vec<NetworkRecord>, NetError> {
        Ok(Self::sim_neighbourhood())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_scan_start(&mut self) -> Result<(), NetError> {
        self.sim_scan_pending = true;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_scan_poll(&mut self) -> ScanPoll {
        if self.sim_scan_pending {
            self.sim_scan_pending = false;
            ScanPoll::Complete(Self::sim_neighbourhood())
        } else {
            ScanPoll::Running
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_set_hostname(&mut self, hostname: &str) {
        info!("wifi: sim hostname '{hostname}'");
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_join(&mut self, ssid: &str, _password: &str) -> Result<(), NetError> {
        info!("wifi: sim joining '{ssid}'");
        self.sim_join_countdown = Some(2);
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_poll_station(&mut self) {
        if let Some(n) = self.sim_join_countdown {
            self.sim_join_countdown = Some(n.saturating_sub(1));
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_joined(&self) -> bool {
        self.sim_join_countdown == Some(0)
    }
}

// ---------------------------------------------------------------------------
// Port implementations
// ---------------------------------------------------------------------------

impl AccessPointPort for WifiAdapter {
    fn start_access_point(
        &mut self,
        ssid: &str,
        gateway: core::net::Ipv4Addr,
        netmask: core::net::Ipv4Addr,
    ) -> Result<(), NetError> {
        self.platform_start_ap(ssid, gateway, netmask)
    }
}

impl WifiScanPort for WifiAdapter {
    fn scan_networks_blocking(&mut self) -> Result<Vec<NetworkRecord>, NetError> {
        self.platform_scan_blocking()
    }

    fn start_scan(&mut self) -> Result<(), NetError> {
        self.platform_scan_start()
    }

    fn poll_scan(&mut self) -> ScanPoll {
        self.platform_scan_poll()
    }
}

impl StationPort for WifiAdapter {
    fn set_hostname(&mut self, hostname: &str) {
        self.platform_set_hostname(hostname);
    }

    fn join(&mut self, ssid: &str, password: &str) -> Result<(), NetError> {
        self.platform_join(ssid, password)
    }

    fn poll_station(&mut self) {
        self.platform_poll_station();
    }

    fn is_joined(&self) -> bool {
        self.platform_is_joined()
    }
}
