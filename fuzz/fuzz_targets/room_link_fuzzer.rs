//! Fuzz target for room link parsing
//!
//! Room links arrive from chat messages and address bars; parsing them must
//! never panic.
//!
//! # Invariants
//!
//! - `RoomEntry::parse` NEVER panics
//! - A parsed entry re-renders to a link that parses back with the same
//!   encryption setting
//! - Links without a fragment are never encrypted

#![no_main]

use libfuzzer_sys::fuzz_target;
use reqwest::Url;
use sofia_client::RoomEntry;

fuzz_target!(|link: &str| {
    let Ok(entry) = RoomEntry::parse(link) else {
        return;
    };

    if !link.contains('#') {
        assert!(!entry.encrypted());
    }

    let Ok(origin) = Url::parse("https://meet.example") else {
        return;
    };
    let Ok(rendered) = entry.link(&origin) else {
        return;
    };
    let reparsed = RoomEntry::parse(rendered.as_str());
    assert!(
        matches!(&reparsed, Ok(again) if again.encrypted() == entry.encrypted()),
        "{rendered} did not round trip: {reparsed:?}"
    );
});
