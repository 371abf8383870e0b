//! Fuzz target: captive-portal DNS packet builders
//!
//! Feeds arbitrary datagrams through `build_response` and `build_servfail`,
//! the two paths every packet hitting the portal resolver takes.
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - A built answer echoes the query ID, flips QR and carries exactly one
//!   A record ending in the portal address octets
//! - SERVFAIL frames are always a bare 12-octet header with RCODE 2
//!
//! cargo fuzz run fuzz_dns_query

#![no_main]

use core::net::Ipv4Addr;

use homie32::adapters::dns::{build_response, build_servfail};
use libfuzzer_sys::fuzz_target;

const PORTAL: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 1);

fuzz_target!(|data: &[u8]| {
    if let Some(answer) = build_response(data, PORTAL, 300) {
        assert_eq!(&answer[..2], &data[..2], "answer must echo the query ID");
        assert_ne!(answer[2] & 0x80, 0, "QR must be set on the answer");
        assert_eq!(
            u16::from_be_bytes([answer[6], answer[7]]),
            1,
            "exactly one answer record"
        );
        assert!(
            answer.ends_with(&PORTAL.octets()),
            "answer must resolve to the portal"
        );
    }

    match build_servfail(data) {
        Some(frame) => {
            assert_eq!(frame.len(), 12, "SERVFAIL is a bare header");
            assert_eq!(&frame[..2], &data[..2], "SERVFAIL must echo the query ID");
            assert_eq!(frame[3] & 0x0F, 2, "RCODE must be SERVFAIL");
        }
        None => assert!(data.len() < 2, "only sub-ID datagrams may be dropped"),
    }
});
