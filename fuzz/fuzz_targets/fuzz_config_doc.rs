//! Fuzz target: `validate_config_document` (the `PUT /config` body path)
//!
//! Parses arbitrary bytes as JSON and runs the validator over whatever
//! comes out, the exact path a hostile portal client exercises.
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - An accepted document always carries a topic-safe, non-empty name
//! - Required credential fields are never empty in an accepted document
//!
//! cargo fuzz run fuzz_config_doc

#![no_main]

use homie32::validate::{hostname_is_valid, validate_config_document};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(doc) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    if let Ok(update) = validate_config_document(&doc) {
        assert!(!update.name.is_empty(), "accepted name must not be empty");
        assert!(
            hostname_is_valid(&update.name),
            "accepted name {:?} violates the alphabet",
            update.name
        );
        assert!(!update.wifi_ssid.is_empty(), "accepted ssid must not be empty");
        assert!(!update.homie_host.is_empty(), "accepted host must not be empty");
        // wifi_password may legitimately be empty (open network).
    }
});
