#![no_main]

use libfuzzer_sys::fuzz_target;
use pingexit::grammar;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Any input either parses or yields an error, never a panic
        if let Ok(condition) = grammar::parse(input) {
            // The canonical form of a valid condition must parse again
            let canonical = condition.to_string();
            assert!(grammar::parse(&canonical).is_ok(), "canonical form rejected: {canonical}");
        }
    }
});
