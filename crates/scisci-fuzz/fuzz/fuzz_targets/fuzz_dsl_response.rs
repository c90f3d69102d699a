#![no_main]

use libfuzzer_sys::fuzz_target;
use scisci_mcp::models::{DslResponse, ListResponse, SourceSchema};

fuzz_target!(|data: &[u8]| {
    if let Ok(json) = serde_json::from_slice::<serde_json::Value>(data) {
        if let Ok(mut response) = serde_json::from_value::<DslResponse>(json.clone()) {
            let key = response.first_record_key().map(str::to_string);
            if let Some(key) = key {
                let _ = response.take_records(&key);
            }
        }
        if let Ok(schema) = serde_json::from_value::<SourceSchema>(json.clone()) {
            let _ = schema.facets();
            let _ = schema.metric_names();
        }
        let _ = serde_json::from_value::<ListResponse>(json);
    }
});
