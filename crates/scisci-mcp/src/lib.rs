//! SciSci MCP Server
//!
//! A Model Context Protocol (MCP) server for the OpenAlex and Dimensions
//! bibliometric databases. Lets LLM agents search and aggregate the
//! literature, check field names before spending API calls, page through
//! large result sets and keep every retrieved record on disk.
//!
//! # Features
//!
//! - **14 MCP Tools**: OpenAlex search/get/group-by/autocomplete/batch, Dimensions
//!   search/aggregate/describe/raw DSL and analytics, skill lint
//! - **Async-first**: Built on Tokio with cursor and skip pagination
//! - **Rate-limited**: 10 req/s for OpenAlex, 30 req/min for Dimensions
//! - **Persistent**: results saved as parquet + jsonl (or tsv/csv)
//!
//! # Example
//!
//! ```no_run
//! use scisci_mcp::{OpenAlexClient, config::Config, models::EntityType, query::SearchParams};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let client = OpenAlexClient::new(&config)?;
//!
//!     let params = SearchParams {
//!         entity: EntityType::Works,
//!         filter: Some("publication_year:2023,cited_by_count:>100"),
//!         ..SearchParams::default()
//!     };
//!     let page = client.list(EntityType::Works, &params.build_page(25, 1)).await?;
//!     println!("{} works", page.meta.count);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod export;
pub mod formatters;
pub mod models;
pub mod progress;
pub mod query;
pub mod server;
pub mod skills;
pub mod tools;
pub mod tracking;
pub mod validation;

pub use client::{DimensionsClient, OpenAlexClient};
pub use config::Config;
pub use error::{ClientError, ExportError, ToolError};
