//! Configuration for the SciSci MCP server.

use std::path::PathBuf;
use std::time::Duration;

use crate::credentials;
use crate::models::ExportFormat;

/// API configuration constants.
pub mod api {
    use std::time::Duration;

    /// Base URL for the OpenAlex REST API.
    pub const OPENALEX_BASE_URL: &str = "https://api.openalex.org";

    /// Default Dimensions API base (app host + `/api`).
    pub const DIMENSIONS_API_URL: &str = "https://app.dimensions.ai/api";

    /// Request timeout. DSL aggregations over large corpora are slow.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

    /// Connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// OpenAlex polite-pool budget.
    pub const OPENALEX_REQUESTS_PER_SECOND: u32 = 10;

    /// Dimensions DSL budget.
    pub const DIMENSIONS_REQUESTS_PER_MINUTE: u32 = 30;

    /// Retries for transient failures.
    pub const MAX_RETRIES: u32 = 3;

    /// Cache TTL (5 minutes).
    pub const CACHE_TTL: Duration = Duration::from_secs(300);

    /// Maximum cache size.
    pub const CACHE_MAX_SIZE: u64 = 1000;

    /// Maximum keepalive connections.
    pub const MAX_KEEPALIVE: usize = 10;

    /// Keepalive expiry.
    pub const KEEPALIVE_EXPIRY: Duration = Duration::from_secs(30);
}

/// Paging limits imposed by the upstream APIs.
pub mod paging {
    /// OpenAlex maximum `per_page`.
    pub const OPENALEX_MAX_PER_PAGE: u32 = 200;

    /// Default OpenAlex result count.
    pub const OPENALEX_DEFAULT_LIMIT: u32 = 25;

    /// Dimensions maximum `limit` per DSL call.
    pub const DIMENSIONS_MAX_LIMIT: u32 = 1000;

    /// Default Dimensions result count.
    pub const DIMENSIONS_DEFAULT_LIMIT: u32 = 20;

    /// Records rendered inline in tool responses.
    pub const INLINE_PREVIEW: usize = 20;
}

/// Default output directories.
pub mod output {
    /// OpenAlex result directory.
    pub const OPENALEX_DIR: &str = "/tmp/openalex-results";

    /// Dimensions result directory.
    pub const DIMENSIONS_DIR: &str = "/tmp/dimensions-results";
}

/// Server configuration.
#[derive(Clone)]
pub struct Config {
    /// OpenAlex API base URL.
    pub openalex_url: String,

    /// Polite-pool email sent as `mailto`.
    pub openalex_email: Option<String>,

    /// Dimensions API base URL (ends in `/api`).
    pub dimensions_url: String,

    /// Dimensions API key.
    pub dimensions_key: Option<String>,

    /// Directory for OpenAlex result files.
    pub openalex_output_dir: PathBuf,

    /// Directory for Dimensions result files.
    pub dimensions_output_dir: PathBuf,

    /// Default on-disk format.
    pub export_format: ExportFormat,

    /// Authentication token for the MCP HTTP transport (optional).
    pub auth_token: Option<String>,

    /// Request timeout.
    pub request_timeout: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// OpenAlex requests per second; `None` disables the gate.
    pub openalex_rate: Option<u32>,

    /// Dimensions requests per minute; `None` disables the gate.
    pub dimensions_rate: Option<u32>,

    /// Retries for transient failures.
    pub max_retries: u32,

    /// Cache TTL.
    pub cache_ttl: Duration,

    /// Maximum cache size.
    pub cache_max_size: u64,
}

impl Config {
    /// Create a configuration with production defaults.
    #[must_use]
    pub fn new(openalex_email: Option<String>, dimensions_key: Option<String>) -> Self {
        Self {
            openalex_url: api::OPENALEX_BASE_URL.to_string(),
            openalex_email,
            dimensions_url: api::DIMENSIONS_API_URL.to_string(),
            dimensions_key,
            openalex_output_dir: PathBuf::from(output::OPENALEX_DIR),
            dimensions_output_dir: PathBuf::from(output::DIMENSIONS_DIR),
            export_format: ExportFormat::default(),
            auth_token: None,
            request_timeout: api::REQUEST_TIMEOUT,
            connect_timeout: api::CONNECT_TIMEOUT,
            openalex_rate: Some(api::OPENALEX_REQUESTS_PER_SECOND),
            dimensions_rate: Some(api::DIMENSIONS_REQUESTS_PER_MINUTE),
            max_retries: api::MAX_RETRIES,
            cache_ttl: api::CACHE_TTL,
            cache_max_size: api::CACHE_MAX_SIZE,
        }
    }

    /// Create a test configuration with both APIs pointed at a mock server.
    ///
    /// Dimensions is mounted under `{base_url}/dimensions`.
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        let tmp = std::env::temp_dir().join("scisci-mcp-tests");
        Self {
            openalex_url: base_url.to_string(),
            openalex_email: None,
            dimensions_url: format!("{base_url}/dimensions"),
            dimensions_key: Some("test-key".to_string()),
            openalex_output_dir: tmp.join("openalex"),
            dimensions_output_dir: tmp.join("dimensions"),
            export_format: ExportFormat::default(),
            auth_token: None,
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            openalex_rate: None, // No gate in tests
            dimensions_rate: None,
            max_retries: 0,
            cache_ttl: Duration::from_secs(0), // No caching in tests
            cache_max_size: 0,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// `.env` is loaded first. Without `DIMENSIONS_KEY`, the key and endpoint
    /// come from `~/.dimensions/dsl.ini` when that file exists.
    ///
    /// # Errors
    ///
    /// Returns error if environment variables are invalid.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let email = non_empty_var("OPENALEX_EMAIL");
        let mut config = Self::new(email, non_empty_var("DIMENSIONS_KEY"));

        if let Some(endpoint) = non_empty_var("DIMENSIONS_ENDPOINT") {
            config.dimensions_url = credentials::api_base(&endpoint);
        }

        if config.dimensions_key.is_none() {
            if let Some(path) = credentials::default_path().filter(|p| p.exists()) {
                match credentials::load(&path, credentials::DEFAULT_INSTANCE) {
                    Ok(creds) => {
                        tracing::debug!(path = %path.display(), "Loaded Dimensions credentials");
                        config.dimensions_key = Some(creds.key);
                        if non_empty_var("DIMENSIONS_ENDPOINT").is_none() {
                            config.dimensions_url = creds.api_url;
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "Ignoring Dimensions credentials file"),
                }
            }
        }

        if let Some(dir) = non_empty_var("SCISCI_OUTPUT_DIR") {
            config = config.with_output_dir(dir);
        }

        config.auth_token = non_empty_var("MCP_SERVER_AUTH_TOKEN");
        Ok(config)
    }

    /// Put both databases' results under one root (`{dir}/openalex`, `{dir}/dimensions`).
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let root = dir.into();
        self.openalex_output_dir = root.join("openalex");
        self.dimensions_output_dir = root.join("dimensions");
        self
    }

    /// Check if Dimensions credentials are configured.
    #[must_use]
    pub const fn has_dimensions_key(&self) -> bool {
        self.dimensions_key.is_some()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("openalex_url", &self.openalex_url)
            .field("openalex_email", &self.openalex_email)
            .field("dimensions_url", &self.dimensions_url)
            .field("has_dimensions_key", &self.has_dimensions_key())
            .field("openalex_output_dir", &self.openalex_output_dir)
            .field("dimensions_output_dir", &self.dimensions_output_dir)
            .field("export_format", &self.export_format)
            .finish()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
