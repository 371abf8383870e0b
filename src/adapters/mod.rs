//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements            | Connects to                  |
//! |-------------|-----------------------|------------------------------|
//! | `device_id` | (identity helpers)    | eFuse factory MAC            |
//! | `dns`       | CaptiveDnsPort        | UDP socket on the DNS port   |
//! | `hardware`  | BootHardware bundle   | the adapters below + GPIO    |
//! | `httpd`     | PortalHttpPort        | ESP-IDF httpd                |
//! | `log_sink`  | EventSink             | Serial log output            |
//! | `mqtt`      | PubSubPort            | esp-mqtt client              |
//! | `nvs`       | ConfigPort            | NVS / in-memory store        |
//! | `system`    | SystemPort            | esp_restart, status LED GPIO |
//! | `time`      | (uptime clock)        | esp_timer                    |
//! | `wifi`      | AccessPointPort       | ESP-IDF WiFi AP+STA          |
//! |             | WifiScanPort          |                              |
//! |             | StationPort           |                              |

pub mod device_id;
pub mod dns;
pub mod hardware;
pub mod httpd;
pub mod log_sink;
pub mod mqtt;
pub mod nvs;
pub mod system;
pub mod time;
pub mod wifi;
