//! Fuzzing library for scisci-mcp.
//!
//! Targets cover the parsers fed by untrusted input: API response envelopes,
//! tool arguments, OpenAlex filter expressions and DSL rewriting.
//!
//! # Usage
//!
//! ```bash
//! cd crates/scisci-fuzz
//! cargo +nightly fuzz run fuzz_dsl_response -- -max_total_time=60
//! ```

pub use scisci_mcp::{models, query};
