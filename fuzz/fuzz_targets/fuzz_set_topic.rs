//! Fuzz target: `TopicRoot::parse_set_topic`
//!
//! Splits arbitrary UTF-8 input into a hostname and an inbound topic and
//! drives the command-topic parser, the path every broker message takes
//! before it can reach a property callback.
//!
//! Invariants checked:
//! - No panics under any input
//! - A parsed `(node, property)` pair is non-empty and slash-free
//! - Parsed segments rebuild the original topic byte for byte
//!
//! cargo fuzz run fuzz_set_topic

#![no_main]

use homie32::publish::TopicRoot;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };

    // Partition: bytes before the first newline name the device, the rest
    // is the inbound topic.
    let (hostname, topic) = match text.split_once('\n') {
        Some(pair) => pair,
        None => ("kitchen-lamp", text),
    };

    let root = TopicRoot::new(hostname);
    if let Some((node, property)) = root.parse_set_topic(topic) {
        assert!(!node.is_empty(), "parsed node id must not be empty");
        assert!(!property.is_empty(), "parsed property must not be empty");
        assert!(!node.contains('/'), "node id must be a single segment");
        assert!(!property.contains('/'), "property must be a single segment");
        assert_eq!(
            root.property_topic(node, property, None, true),
            topic,
            "parsed segments must rebuild the original topic"
        );
    }
});
