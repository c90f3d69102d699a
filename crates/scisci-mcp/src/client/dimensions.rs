//! Dimensions DSL client.
//!
//! Authentication exchanges the API key for a JWT at `/auth.json`; the token
//! is shared by every clone and refreshed once when the API answers 401.

use std::sync::Arc;

use moka::future::Cache;
use serde_json::{Value, json};
use tokio::sync::RwLock;

use super::{HttpCore, RateGate};
use crate::config::{Config, paging};
use crate::error::{ClientError, ClientResult};
use crate::models::{DimensionsSource, DslResponse, SourceSchema};
use crate::query::dsl;

/// Outcome of [`DimensionsClient::query_iterative`].
#[derive(Debug, Clone, Default)]
pub struct IterativeResult {
    /// `min(total_count, max_results)` from the first page; `None` when
    /// neither is known.
    pub total: Option<u64>,
    /// Retrieved records.
    pub records: Vec<Value>,
    /// Key the records were read from (`publications`, ..., or `results`).
    pub key: String,
    /// Source the records belong to.
    pub source: Option<DimensionsSource>,
    /// Query as issued, without pagination.
    pub base_query: String,
    /// Page size used.
    pub batch_size: u32,
    /// Pages fetched.
    pub pages: u32,
    /// API warnings plus any early-stop notice.
    pub warnings: Vec<String>,
}

/// Dimensions API client.
#[derive(Clone)]
pub struct DimensionsClient {
    core: HttpCore,
    api_url: String,
    key: Option<String>,
    token: Arc<RwLock<Option<String>>>,
    schemas: Cache<DimensionsSource, Arc<SourceSchema>>,
}

impl DimensionsClient {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let core = HttpCore::new(config, RateGate::per_minute(config.dimensions_rate))?;
        Ok(Self {
            core,
            api_url: config.dimensions_url.trim_end_matches('/').to_string(),
            key: config.dimensions_key.clone(),
            token: Arc::new(RwLock::new(None)),
            schemas: Cache::new(16),
        })
    }

    /// Check if an API key is configured.
    #[must_use]
    pub const fn has_key(&self) -> bool {
        self.key.is_some()
    }

    /// Exchange the API key for a session token and store it.
    pub async fn authenticate(&self) -> ClientResult<String> {
        let mut slot = self.token.write().await;
        let token = self.login().await?;
        *slot = Some(token.clone());
        Ok(token)
    }

    async fn login(&self) -> ClientResult<String> {
        let key = self.key.as_deref().ok_or_else(|| {
            ClientError::MissingCredentials("no Dimensions API key configured".to_string())
        })?;

        let url = format!("{}/auth.json", self.api_url);
        let body = json!({ "key": key }).to_string();
        let value = self.core.post_json(&url, body, "application/json", None, false).await?;

        let token = value
            .get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ClientError::unauthorized("authentication response carried no token"))?;

        tracing::info!("Authenticated with Dimensions");
        Ok(token.to_string())
    }

    async fn session_token(&self) -> ClientResult<String> {
        if let Some(token) = self.token.read().await.clone() {
            return Ok(token);
        }

        let mut slot = self.token.write().await;
        if let Some(token) = slot.clone() {
            return Ok(token);
        }
        let token = self.login().await?;
        *slot = Some(token.clone());
        Ok(token)
    }

    async fn invalidate(&self, stale: &str) {
        let mut slot = self.token.write().await;
        if slot.as_deref() == Some(stale) {
            *slot = None;
        }
    }

    /// Run a DSL query and return the raw JSON body.
    ///
    /// A 401 clears the token, re-authenticates once and retries once.
    pub async fn query_value(&self, query: &str) -> ClientResult<Value> {
        let url = format!("{}/dsl/v2", self.api_url);
        let token = self.session_token().await?;

        tracing::debug!(dsl = query, "DSL query");
        match self.send_query(&url, query, &token).await {
            Err(ClientError::Unauthorized { message }) => {
                tracing::warn!(%message, "Dimensions token rejected, re-authenticating");
                self.invalidate(&token).await;
                let fresh = self.session_token().await?;
                self.send_query(&url, query, &fresh).await
            }
            other => other,
        }
    }

    async fn send_query(&self, url: &str, query: &str, token: &str) -> ClientResult<Value> {
        let auth = format!("JWT {token}");
        self.core.post_json(url, query.to_string(), "text/plain", Some(&auth), true).await
    }

    /// Run a DSL query.
    pub async fn query(&self, query: &str) -> ClientResult<DslResponse> {
        let value = self.query_value(query).await?;
        let response: DslResponse = serde_json::from_value(value)?;
        for warning in &response.warnings {
            tracing::warn!(%warning, "DSL warning");
        }
        Ok(response)
    }

    /// Retrieve more than one page by rewriting `limit`/`skip`.
    ///
    /// `source` names the records key; when `None` it is detected from the
    /// query text. Stops on an empty page, once `min(total_count, max_results)`
    /// records were seen, or on a short page. A failure on the first page is
    /// returned; a later failure keeps the partial result.
    pub async fn query_iterative(
        &self,
        query: &str,
        source: Option<DimensionsSource>,
        max_results: Option<u64>,
        batch_size: u32,
    ) -> ClientResult<IterativeResult> {
        let batch = batch_size.clamp(1, paging::DIMENSIONS_MAX_LIMIT);
        let base = dsl::strip_pagination(query);
        let source = source.or_else(|| dsl::detect_source(&base));
        let key = source.map_or("results", DimensionsSource::as_str).to_string();

        let mut result = IterativeResult {
            key: key.clone(),
            source,
            base_query: base.clone(),
            batch_size: batch,
            ..IterativeResult::default()
        };
        let mut goal = None;
        let mut skip = 0u64;

        loop {
            let page_query = dsl::paginate(&base, batch, skip);
            let mut response = match self.query(&page_query).await {
                Ok(r) => r,
                Err(e) if result.pages == 0 => return Err(e),
                Err(e) => {
                    tracing::warn!(skip, error = %e, "pagination stopped early");
                    result.warnings.push(format!("Error at skip={skip}: {e}"));
                    break;
                }
            };
            result.pages += 1;

            let total = *goal.get_or_insert_with(|| match (response.total_count(), max_results) {
                (Some(count), Some(max)) => Some(count.min(max)),
                (count, max) => count.or(max),
            });
            result.total = total;

            for warning in response.warnings.drain(..) {
                if !result.warnings.contains(&warning) {
                    result.warnings.push(warning);
                }
            }

            let batch_data = response.take_records(&key);
            if batch_data.is_empty() {
                break;
            }
            let received = batch_data.len();
            result.records.extend(batch_data);
            skip += u64::from(batch);

            tracing::debug!(
                page = result.pages,
                retrieved = result.records.len(),
                ?total,
                "DSL page fetched"
            );

            let reached = total.is_some_and(|t| result.records.len() as u64 >= t);
            if reached || received < batch as usize {
                break;
            }
        }

        if let Some(max) = max_results {
            result.records.truncate(usize::try_from(max).unwrap_or(usize::MAX));
        }
        Ok(result)
    }

    /// Schema of a source, cached per client.
    pub async fn describe_source(&self, source: DimensionsSource) -> ClientResult<Arc<SourceSchema>> {
        if let Some(schema) = self.schemas.get(&source).await {
            return Ok(schema);
        }

        let value = self.query_value(&dsl::describe_source(source)).await?;
        let schema = Arc::new(serde_json::from_value::<SourceSchema>(value)?);
        tracing::debug!(
            %source,
            facets = schema.facets().len(),
            filters = schema.filters().len(),
            metrics = schema.metric_names().len(),
            "schema loaded"
        );
        self.schemas.insert(source, Arc::clone(&schema)).await;
        Ok(schema)
    }
}

impl std::fmt::Debug for DimensionsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DimensionsClient")
            .field("api_url", &self.api_url)
            .field("has_key", &self.has_key())
            .finish()
    }
}
