//! Data models for OpenAlex and Dimensions.
//!
//! Records are kept as `serde_json::Value` so exports keep every nested
//! field; envelopes and tool inputs are typed.

mod dimensions;
mod enums;
mod inputs;
mod openalex;

pub use dimensions::{DslResponse, DslStats, FieldInfo, SourceSchema};
pub use enums::{DimensionsSource, EntityType, ExportFormat, ResponseFormat, SearchField};
pub use inputs::*;
pub use openalex::{
    AutocompleteMatch, AutocompleteResponse, EntityView, GroupBucket, ListResponse, Meta, WorkView,
    short_id,
};
