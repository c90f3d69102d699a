#![no_main]

use libfuzzer_sys::fuzz_target;
use scisci_mcp::models::{DimensionsRawInput, DimensionsSearchInput, OpenAlexSearchInput};

fuzz_target!(|data: &[u8]| {
    // Tool arguments arrive as arbitrary JSON from the client
    let _ = serde_json::from_slice::<OpenAlexSearchInput>(data);
    let _ = serde_json::from_slice::<DimensionsSearchInput>(data);
    let _ = serde_json::from_slice::<DimensionsRawInput>(data);
});
