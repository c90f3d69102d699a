//! Output formatters for tool responses.

mod json;
mod markdown;

pub use self::json::*;
pub use markdown::*;
