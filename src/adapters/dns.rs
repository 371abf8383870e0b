//! Catch-all DNS responder for the provisioning portal.
//!
//! Every well-formed A query is answered with the portal gateway
//! address, which is what makes phones raise their captive-portal sheet.
//! Anything parseable that cannot be served gets SERVFAIL so clients
//! fail fast instead of timing out; only datagrams too short to echo an
//! ID are dropped.
//!
//! `std::net` sockets run on lwIP under ESP-IDF, so one socket
//! implementation covers the device and the host simulation. Packet
//! assembly is kept in pure functions for direct testing.

use std::net::UdpSocket;

use log::{info, warn};

use crate::ports::{CaptiveDnsPort, NetError};

const HEADER_LEN: usize = 12;
const RCODE_SERVFAIL: u8 = 0x02;

/// Port 53 needs elevated privileges on dev hosts.
#[cfg(target_os = "espidf")]
const DNS_BIND: &str = "0.0.0.0:53";
#[cfg(not(target_os = "espidf"))]
const DNS_BIND: &str = "0.0.0.0:5353";

pub struct CaptiveDnsServer {
    socket: Option<UdpSocket>,
    portal_addr: core::net::Ipv4Addr,
    ttl_secs: u32,
}

impl CaptiveDnsServer {
    pub fn new() -> Self {
        Self {
            socket: None,
            portal_addr: core::net::Ipv4Addr::UNSPECIFIED,
            ttl_secs: 0,
        }
    }
}

impl Default for CaptiveDnsServer {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptiveDnsPort for CaptiveDnsServer {
    fn start_captive_dns(
        &mut self,
        portal_addr: core::net::Ipv4Addr,
        ttl_secs: u32,
    ) -> Result<(), NetError> {
        let socket = UdpSocket::bind(DNS_BIND).map_err(|e| {
            warn!("dns: bind {DNS_BIND} failed: {e}");
            NetError::DnsStartFailed
        })?;
        socket.set_nonblocking(true).map_err(|e| {
            warn!("dns: set_nonblocking failed: {e}");
            NetError::DnsStartFailed
        })?;
        self.socket = Some(socket);
        self.portal_addr = portal_addr;
        self.ttl_secs = ttl_secs;
        info!("dns: catch-all resolver on {DNS_BIND} answering {portal_addr}");
        Ok(())
    }

    /// Serve at most one pending datagram. Never blocks.
    fn process_dns_request(&mut self) {
        let Some(socket) = &self.socket else {
            return;
        };
        let mut buf = [0u8; 512];
        match socket.recv_from(&mut buf) {
            Ok((len, peer)) => {
                let query = &buf[..len];
                let reply = build_response(query, self.portal_addr, self.ttl_secs)
                    .or_else(|| build_servfail(query));
                if let Some(bytes) = reply {
                    if let Err(e) = socket.send_to(&bytes, peer) {
                        warn!("dns: send to {peer} failed: {e}");
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(e) => warn!("dns: recv failed: {e}"),
        }
    }
}

/// Answer a standard query with one A record for the portal address.
///
/// Returns `None` when the datagram is not a plain single-question query;
/// the caller downgrades those to SERVFAIL.
pub fn build_response(
    query: &[u8],
    portal_addr: core::net::Ipv4Addr,
    ttl_secs: u32,
) -> Option<Vec<u8>> {
    if query.len() < HEADER_LEN {
        return None;
    }
    // QR must be 0 and the opcode a standard query.
    if query[2] & 0x80 != 0 || query[2] & 0x78 != 0 {
        return None;
    }
    let qdcount = u16::from_be_bytes([query[4], query[5]]);
    let ancount = u16::from_be_bytes([query[6], query[7]]);
    let nscount = u16::from_be_bytes([query[8], query[9]]);
    if qdcount != 1 || ancount != 0 || nscount != 0 {
        return None;
    }
    let qend = question_end(query)?;

    let mut out = Vec::with_capacity(qend + 16);
    out.extend_from_slice(&query[..qend]);
    // Response, authoritative, RD copied from the query, RCODE 0.
    out[2] = 0x84 | (query[2] & 0x01);
    out[3] = 0x00;
    out[4..6].copy_from_slice(&1u16.to_be_bytes());
    out[6..8].copy_from_slice(&1u16.to_be_bytes());
    // Additionals from the query (EDNS) are not echoed back.
    out[8..10].copy_from_slice(&0u16.to_be_bytes());
    out[10..12].copy_from_slice(&0u16.to_be_bytes());
    // Answer: pointer to the question name, A record, IN class.
    out.extend_from_slice(&[0xC0, 0x0C, 0x00, 0x01, 0x00, 0x01]);
    out.extend_from_slice(&ttl_secs.to_be_bytes());
    out.extend_from_slice(&[0x00, 0x04]);
    out.extend_from_slice(&portal_addr.octets());
    Some(out)
}

/// Find the index just past QTYPE/QCLASS of the first question.
fn question_end(query: &[u8]) -> Option<usize> {
    let mut i = HEADER_LEN;
    loop {
        let len = *query.get(i)? as usize;
        if len == 0 {
            i += 1;
            break;
        }
        // Compression pointers never appear in a question we serve.
        if len & 0xC0 != 0 {
            return None;
        }
        i += 1 + len;
    }
    let end = i + 4;
    (end <= query.len()).then_some(end)
}

/// Minimal SERVFAIL header echoing the query ID. `None` when the
/// datagram is too short to even carry an ID.
pub fn build_servfail(query: &[u8]) -> Option<Vec<u8>> {
    if query.len() < 2 {
        return None;
    }
    let rd = query.get(2).map_or(0, |b| b & 0x01);
    let mut out = vec![0u8; HEADER_LEN];
    out[0] = query[0];
    out[1] = query[1];
    out[2] = 0x80 | rd;
    out[3] = RCODE_SERVFAIL;
    Some(out)
}
