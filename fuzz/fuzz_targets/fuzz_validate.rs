#![no_main]

use libfuzzer_sys::fuzz_target;
use statechart_lint::{Config, Validator, serialize};

fuzz_target!(|data: &[u8]| {
    let s = String::from_utf8_lossy(data);
    let validator = Validator::new(Config::default().with_source_name("fuzz.scxml"));

    let (result, _doc) = match validator.validate_string(&s) {
        Ok(r) => r,
        Err(_) => return,
    };

    // Every report must survive the JSON reporter.
    let json = serialize(&result).expect("report serializes");
    let back: serde_json::Value = serde_json::from_str(&json).expect("report is valid JSON");
    assert_eq!(
        back["diagnostics"].as_array().map(Vec::len),
        Some(result.diagnostics.len())
    );
});
