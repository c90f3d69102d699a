//! Query construction for OpenAlex REST parameters and the Dimensions DSL.

pub mod dsl;
pub mod openalex;

pub use dsl::SearchQuery;
pub use openalex::{Filter, SearchParams};
