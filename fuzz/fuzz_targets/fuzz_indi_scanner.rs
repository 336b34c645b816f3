//! Fuzz target: `Scanner::feed` / `Scanner::next_element`
//!
//! Feeds arbitrary bytes from an INDI server into the incremental XML
//! scanner, split at a fuzzer-chosen point, and checks that it never
//! panics and never holds more than it was given.
//!
//! cargo fuzz run fuzz_indi_scanner

#![no_main]

use libfuzzer_sys::fuzz_target;
use observatory::adapters::indi::xml::{Scanner, unescape};

fuzz_target!(|data: &[u8]| {
    let Some((&split, body)) = data.split_first() else {
        return;
    };
    let split = usize::from(split).min(body.len());

    let mut scanner = Scanner::new();
    for chunk in [&body[..split], &body[split..]] {
        scanner.feed(chunk);
        while let Some(result) = scanner.next_element() {
            if let Ok(element) = result {
                assert!(!element.name.is_empty(), "element without a name");
            }
        }
    }
    assert!(scanner.pending() <= body.len());

    if let Ok(text) = std::str::from_utf8(body) {
        let _ = unescape(text);
    }
});
