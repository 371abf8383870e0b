//! Background network scanning for the provisioning portal.
//!
//! One `NetworkScanner` owns the whole scan lifecycle: the initial
//! synchronous sweep during portal bring-up, the periodic non-blocking
//! rescans afterwards, and the cached JSON document that `GET /networks`
//! serves. The cache is regenerated only when a scan finishes, so repeated
//! reads between scans return byte-identical documents and never block.

use log::{info, warn};
use serde::Serialize;

use crate::ports::{ScanPoll, WifiScanPort};

/// A new scan is started this long after the previous one *started*,
/// and only once that one has ended.
pub const RESCAN_INTERVAL_MS: u64 = 20_000;

/// Serialized form of "no networks visible".
pub const EMPTY_NETWORKS_DOC: &str = "{\"networks\":[]}";

/// Worst-case serialized size of one network entry: 32-char SSID plus
/// punctuation, a 4-digit RSSI and the longest encryption tag. Escaping can
/// push past this; the buffer grows, this is just the initial reservation.
const ENTRY_JSON_WORST_CASE: usize = 80;

/// Authentication modes reported to the provisioning UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Encryption {
    Wep,
    Wpa,
    Wpa2,
    /// Open network.
    None,
    /// Mixed or unrecognised; the UI lets the user decide.
    Auto,
}

/// One visible network as served by `GET /networks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkRecord {
    pub ssid: String,
    pub rssi: i32,
    pub encryption: Encryption,
}

#[derive(Serialize)]
struct NetworksDocument<'a> {
    networks: &'a [NetworkRecord],
}

/// Map an RSSI reading in dBm onto the 0–100 % scale the UI shows.
pub fn rssi_to_percentage(rssi: i32) -> u8 {
    if rssi <= -100 {
        0
    } else if rssi >= -50 {
        100
    } else {
        (2 * (rssi + 100)) as u8
    }
}

/// Phase of the single-flight scan machine. `Done`/`Failed` are the poll
/// outcomes that regenerate the cache and land back in `Idle` within the
/// same tick, so a phase value never outlives a finished scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanPhase {
    Idle,
    Scanning,
}

/// Owner of the scan state and the cached `/networks` document.
#[derive(Debug)]
pub struct NetworkScanner {
    phase: ScanPhase,
    cached_json: String,
    network_count: usize,
    /// Start time of the most recent scan attempt, completed or not.
    last_scan_started_ms: u64,
}

impl NetworkScanner {
    pub fn new() -> Self {
        Self {
            phase: ScanPhase::Idle,
            cached_json: EMPTY_NETWORKS_DOC.to_owned(),
            network_count: 0,
            last_scan_started_ms: 0,
        }
    }

    /// Run the one synchronous sweep during portal bring-up. Must be called
    /// after the access point is active; scanning before the AP is up
    /// returns nothing on this radio.
    pub fn initial_scan(&mut self, radio: &mut impl WifiScanPort, now_ms: u64) {
        self.last_scan_started_ms = now_ms;
        match radio.scan_networks_blocking() {
            Ok(records) => {
                info!("initial Wi-Fi scan found {} networks", records.len());
                self.regenerate(&records);
            }
            Err(e) => {
                warn!("initial Wi-Fi scan failed ({e}), serving empty list");
                self.regenerate(&[]);
            }
        }
    }

    /// Check on an in-flight scan. Call every tick, before
    /// [`NetworkScanner::maybe_start_scan`].
    pub fn poll_completion(&mut self, radio: &mut impl WifiScanPort) {
        if self.phase != ScanPhase::Scanning {
            return;
        }
        match radio.poll_scan() {
            ScanPoll::Running => {}
            ScanPoll::Complete(records) => {
                if let Some(best) = records.iter().map(|r| r.rssi).max() {
                    info!(
                        "Wi-Fi scan complete: {} networks, strongest {}%",
                        records.len(),
                        rssi_to_percentage(best)
                    );
                } else {
                    info!("Wi-Fi scan complete: no networks visible");
                }
                self.regenerate(&records);
                self.phase = ScanPhase::Idle;
            }
            ScanPoll::Failed => {
                warn!("Wi-Fi scan failed, serving empty network list");
                self.regenerate(&[]);
                self.phase = ScanPhase::Idle;
            }
        }
    }

    /// Start the next scan once the interval since the previous scan start
    /// has elapsed and no scan is in flight.
    pub fn maybe_start_scan(&mut self, radio: &mut impl WifiScanPort, now_ms: u64) {
        if self.phase != ScanPhase::Idle {
            return;
        }
        if now_ms.wrapping_sub(self.last_scan_started_ms) < RESCAN_INTERVAL_MS {
            return;
        }
        // A failed start still consumes the interval slot, so a broken
        // radio degrades to one attempt per interval instead of one per
        // tick.
        self.last_scan_started_ms = now_ms;
        match radio.start_scan() {
            Ok(()) => {
                info!("starting background Wi-Fi rescan");
                self.phase = ScanPhase::Scanning;
            }
            Err(e) => warn!("could not start Wi-Fi rescan: {e}"),
        }
    }

    /// The document `GET /networks` serves. Always valid JSON, stable
    /// between scan completions, never triggers radio work.
    pub fn cached_document(&self) -> &str {
        &self.cached_json
    }

    /// True while a scan is in flight.
    pub fn is_scanning(&self) -> bool {
        self.phase == ScanPhase::Scanning
    }

    /// Networks in the cached document.
    pub fn network_count(&self) -> usize {
        self.network_count
    }

    fn regenerate(&mut self, records: &[NetworkRecord]) {
        let doc = NetworksDocument { networks: records };
        let mut buf = Vec::with_capacity(16 + ENTRY_JSON_WORST_CASE * records.len());
        match serde_json::to_writer(&mut buf, &doc) {
            Ok(()) => {
                self.cached_json =
                    String::from_utf8(buf).unwrap_or_else(|_| EMPTY_NETWORKS_DOC.to_owned());
                self.network_count = records.len();
            }
            Err(e) => {
                warn!("could not serialize network list: {e}");
                self.cached_json = EMPTY_NETWORKS_DOC.to_owned();
                self.network_count = 0;
            }
        }
    }
}
