//! OpenAlex REST client.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use moka::future::Cache;
use serde_json::Value;

use super::{HttpCore, RateGate};
use crate::config::{Config, paging};
use crate::error::{ClientError, ClientResult};
use crate::models::{AutocompleteResponse, EntityType, ListResponse, short_id};

const INVALID_GROUP_BY: &str = "__invalid_field_to_get_valid_list__";
const INVALID_SELECT: &str = "__invalid_field__";
const GROUP_BY_MARKER: &str = "Valid fields are";
const SELECT_MARKER: &str = "Valid fields for select are:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum FieldKind {
    GroupBy,
    Select,
}

/// One page of a cursor walk.
#[derive(Debug, Clone)]
pub struct CursorPage {
    /// 1-based page number.
    pub page: u32,
    /// `min(meta.count, max_results)` as seen on the first page.
    pub target: u64,
    /// Records on this page.
    pub results: Vec<Value>,
}

/// Outcome of [`OpenAlexClient::fetch_all`].
#[derive(Debug, Clone, Default)]
pub struct CursorResult {
    /// `min(meta.count, max_results)`.
    pub total: u64,
    /// Retrieved records.
    pub records: Vec<Value>,
    /// API calls made.
    pub pages: u32,
    /// Set when a later page failed and the result is partial.
    pub warnings: Vec<String>,
}

/// OpenAlex API client.
#[derive(Clone)]
pub struct OpenAlexClient {
    core: HttpCore,
    base_url: String,
    mailto: Option<String>,
    fields: Cache<(EntityType, FieldKind), Arc<BTreeSet<String>>>,
}

impl OpenAlexClient {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let core = HttpCore::new(config, RateGate::per_second(config.openalex_rate))?;
        Ok(Self {
            core,
            base_url: config.openalex_url.trim_end_matches('/').to_string(),
            mailto: config.openalex_email.clone(),
            fields: Cache::new(64),
        })
    }

    /// Check if a polite-pool email is configured.
    #[must_use]
    pub const fn has_email(&self) -> bool {
        self.mailto.is_some()
    }

    /// List an entity collection with the given parameters.
    pub async fn list(
        &self,
        entity: EntityType,
        params: &[(String, String)],
    ) -> ClientResult<ListResponse> {
        let url = format!("{}/{entity}", self.base_url);
        let value = self.get(&url, params.to_vec()).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Fetch a single entity by OpenAlex ID, DOI URL, ORCID or ROR.
    pub async fn get_entity(
        &self,
        entity: EntityType,
        id: &str,
        select: Option<&str>,
    ) -> ClientResult<Value> {
        let id = short_id(id.trim());
        let url = format!("{}/{entity}/{id}", self.base_url);
        let params = select
            .filter(|s| !s.is_empty())
            .map(|s| vec![("select".to_string(), s.to_string())])
            .unwrap_or_default();

        self.get(&url, params).await.map_err(|e| match e {
            ClientError::NotFound { .. } => ClientError::not_found(format!("{entity}/{id}")),
            other => other,
        })
    }

    /// Aggregate counts by `field`.
    pub async fn group_by(
        &self,
        entity: EntityType,
        field: &str,
        params: &[(String, String)],
    ) -> ClientResult<ListResponse> {
        let mut params = params.to_vec();
        params.push(("group_by".to_string(), field.to_string()));
        self.list(entity, &params).await
    }

    /// Type-ahead search.
    pub async fn autocomplete(
        &self,
        entity: EntityType,
        query: &str,
        filter: Option<&str>,
    ) -> ClientResult<AutocompleteResponse> {
        let url = format!("{}/autocomplete/{entity}", self.base_url);
        let mut params = vec![("q".to_string(), query.to_string())];
        if let Some(f) = filter.filter(|f| !f.is_empty()) {
            params.push(("filter".to_string(), f.to_string()));
        }
        let value = self.get(&url, params).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Walk a result set page by page with cursor pagination.
    ///
    /// Stops on an empty page, once `min(count, max_results)` records were
    /// seen, or when the API returns no next cursor. The first error ends
    /// the stream.
    pub fn cursor_pages(
        &self,
        entity: EntityType,
        params: &[(String, String)],
        max_results: Option<u64>,
    ) -> impl Stream<Item = ClientResult<CursorPage>> + Send + '_ {
        let base: Vec<(String, String)> = params
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), "cursor" | "page" | "per_page"))
            .cloned()
            .collect();

        async_stream::try_stream! {
            let mut cursor = "*".to_string();
            let mut retrieved = 0u64;
            let mut goal = None;
            let mut page = 0u32;

            loop {
                let mut query = base.clone();
                query.push(("cursor".to_string(), cursor.clone()));
                query.push(("per_page".to_string(), paging::OPENALEX_MAX_PER_PAGE.to_string()));

                let response = self.list(entity, &query).await?;
                page += 1;

                let target = *goal.get_or_insert_with(|| {
                    let count = response.meta.count;
                    tracing::debug!(%entity, count, "cursor walk started");
                    max_results.map_or(count, |m| count.min(m))
                });

                if response.results.is_empty() {
                    break;
                }

                retrieved += response.results.len() as u64;
                let next_cursor = response.meta.next_cursor.clone();
                yield CursorPage { page, target, results: response.results };

                if retrieved >= target {
                    break;
                }
                match next_cursor {
                    Some(next) if !next.is_empty() => cursor = next,
                    _ => break,
                }
            }
        }
    }

    /// Collect a cursor walk into one result.
    ///
    /// A failure on the first page is returned; a failure later keeps the
    /// records fetched so far and records a warning.
    pub async fn fetch_all(
        &self,
        entity: EntityType,
        params: &[(String, String)],
        max_results: Option<u64>,
    ) -> ClientResult<CursorResult> {
        let mut result = CursorResult::default();
        let stream = self.cursor_pages(entity, params, max_results);
        futures::pin_mut!(stream);

        while let Some(page) = stream.next().await {
            match page {
                Ok(page) => {
                    result.pages = page.page;
                    result.total = page.target;
                    result.records.extend(page.results);
                    tracing::debug!(
                        retrieved = result.records.len(),
                        target = result.total,
                        "cursor page fetched"
                    );
                }
                Err(e) if result.pages == 0 => return Err(e),
                Err(e) => {
                    tracing::warn!(error = %e, page = result.pages + 1, "pagination stopped early");
                    result.warnings.push(format!(
                        "Pagination stopped after {} records: {e}",
                        result.records.len()
                    ));
                    break;
                }
            }
        }

        if let Some(max) = max_results {
            result.records.truncate(usize::try_from(max).unwrap_or(usize::MAX));
        }
        Ok(result)
    }

    /// Fields accepted by `group_by` for `entity`; empty when discovery fails.
    pub async fn valid_group_by_fields(&self, entity: EntityType) -> Arc<BTreeSet<String>> {
        self.discover(entity, FieldKind::GroupBy).await
    }

    /// Fields accepted by `select` for `entity`; empty when discovery fails.
    pub async fn valid_select_fields(&self, entity: EntityType) -> Arc<BTreeSet<String>> {
        self.discover(entity, FieldKind::Select).await
    }

    // The API lists valid fields in the 400 it returns for an unknown one.
    async fn discover(&self, entity: EntityType, kind: FieldKind) -> Arc<BTreeSet<String>> {
        if let Some(cached) = self.fields.get(&(entity, kind)).await {
            return cached;
        }

        let (param, probe, marker) = match kind {
            FieldKind::GroupBy => ("group_by", INVALID_GROUP_BY, GROUP_BY_MARKER),
            FieldKind::Select => ("select", INVALID_SELECT, SELECT_MARKER),
        };
        let params = vec![
            (param.to_string(), probe.to_string()),
            ("per_page".to_string(), "1".to_string()),
        ];
        let url = format!("{}/{entity}", self.base_url);

        let found = match self.get(&url, params).await {
            Err(ClientError::BadRequest { message }) => parse_valid_fields(&message, marker),
            Err(e) => {
                tracing::warn!(%entity, param, error = %e, "field discovery failed");
                BTreeSet::new()
            }
            Ok(_) => BTreeSet::new(),
        };

        let found = Arc::new(found);
        if found.is_empty() {
            tracing::warn!(%entity, param, "no valid field list returned; skipping validation");
        } else {
            tracing::debug!(%entity, param, count = found.len(), "valid fields discovered");
            self.fields.insert((entity, kind), Arc::clone(&found)).await;
        }
        found
    }

    async fn get(&self, url: &str, mut params: Vec<(String, String)>) -> ClientResult<Value> {
        if let Some(email) = &self.mailto {
            params.push(("mailto".to_string(), email.clone()));
        }
        self.core.get_json(url, &params).await
    }
}

/// Parse `"... Valid fields are a, b, c."` style messages.
pub(crate) fn parse_valid_fields(message: &str, marker: &str) -> BTreeSet<String> {
    let Some((_, rest)) = message.split_once(marker) else {
        return BTreeSet::new();
    };

    rest.trim()
        .trim_start_matches(':')
        .trim()
        .trim_end_matches('.')
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(String::from)
        .collect()
}

impl std::fmt::Debug for OpenAlexClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAlexClient")
            .field("base_url", &self.base_url)
            .field("has_email", &self.has_email())
            .finish()
    }
}
