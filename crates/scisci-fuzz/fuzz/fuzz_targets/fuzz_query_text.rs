#![no_main]

use libfuzzer_sys::fuzz_target;
use scisci_mcp::query::{Filter, dsl};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(filter) = Filter::parse(text) {
        let _ = Filter::parse(&filter.to_string());
    }

    let base = dsl::strip_pagination(text);
    let _ = dsl::detect_source(&base);
    let _ = dsl::extract_terms(text);
    let _ = dsl::escape(text);
});
