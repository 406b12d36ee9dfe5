#![no_main]

use libfuzzer_sys::fuzz_target;
use statechart_lint::{Config, PrettyOptions, PrettyReporter, Validator};

fuzz_target!(|data: &[u8]| {
    let s = String::from_utf8_lossy(data);
    let validator = Validator::new(Config::default().with_source_name("fuzz.scxml"));
    let Ok((result, _doc)) = validator.validate_string(&s) else {
        return;
    };

    // Code frames over arbitrary text must never panic, with or without expansion.
    for expand_element in [false, true] {
        let options = PrettyOptions {
            expand_element,
            ..PrettyOptions::default()
        };
        let text = PrettyReporter::new(options)
            .with_source("fuzz.scxml", &s)
            .render(&result);
        assert!(text.contains("summary: "));
    }
});
