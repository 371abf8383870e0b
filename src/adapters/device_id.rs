//! Device identity derived from the ESP32 factory MAC address.
//!
//! Produces the stable names the lifecycle hangs off the hardware:
//! - the portal access-point SSID, `Homie-xxyyzz` (last 3 MAC bytes in
//!   lowercase hex), deterministic across reboots
//! - a provisional hostname, `homie-xxyyzz`, used until the portal stores
//!   a user-chosen device name

/// Fixed-size AP SSID: "Homie-xxyyzz" fits well inside the 32-byte
/// SSID limit.
pub type ApSsid = heapless::String<32>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xC0, 0xFE]
}

/// Portal AP SSID from the last 3 MAC bytes.
/// Format: `Homie-xxyyzz` (e.g. `Homie-efc0fe`).
pub fn ap_ssid(mac: &MacAddress) -> ApSsid {
    let mut id = ApSsid::new();
    use core::fmt::Write;
    let _ = write!(id, "Homie-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    id
}

/// Provisional hostname, used until provisioning stores a device name.
/// Format: `homie-xxyyzz` (lowercase, topic-safe).
pub fn provisional_hostname(mac: &MacAddress) -> heapless::String<24> {
    let mut name = heapless::String::<24>::new();
    use core::fmt::Write;
    let _ = write!(name, "homie-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    name
}
