//! OpenAlex and Dimensions API clients.
//!
//! Both clients share the same HTTP core:
//! - Connection pooling via reqwest
//! - Retry middleware with exponential backoff
//! - A token-bucket rate gate per upstream (10 req/s OpenAlex, 30 req/min Dimensions)
//! - Response caching with 5-minute TTL

mod dimensions;
mod middleware;
mod openalex;

use std::time::Duration;

use moka::future::Cache;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde_json::Value;

pub use dimensions::{DimensionsClient, IterativeResult};
pub use middleware::RateGate;
pub use openalex::{CursorPage, CursorResult, OpenAlexClient};

use crate::config::{Config, api};
use crate::error::{ClientError, ClientResult};

/// HTTP plumbing shared by both API clients.
#[derive(Clone)]
pub(crate) struct HttpCore {
    http: ClientWithMiddleware,
    cache: Cache<String, Value>,
    timeout: Duration,
}

impl HttpCore {
    pub(crate) fn new(config: &Config, gate: RateGate) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(api::MAX_KEEPALIVE)
            .pool_idle_timeout(api::KEEPALIVE_EXPIRY)
            .user_agent(concat!("scisci-mcp/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .build()?;

        let mut builder = ClientBuilder::new(client);
        if config.max_retries > 0 {
            let retry_policy = ExponentialBackoff::builder()
                .retry_bounds(Duration::from_secs(1), Duration::from_secs(30))
                .build_with_max_retries(config.max_retries);
            builder = builder.with(RetryTransientMiddleware::new_with_policy(retry_policy));
        }
        builder = builder.with(gate);

        let cache = Cache::builder()
            .max_capacity(config.cache_max_size)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self { http: builder.build(), cache, timeout: config.request_timeout })
    }

    /// GET a JSON document, consulting the cache first.
    pub(crate) async fn get_json(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> ClientResult<Value> {
        let cache_key = cache_key("GET", url, params);
        if let Some(cached) = self.cache.get(&cache_key).await {
            tracing::trace!(url, "cache hit");
            return Ok(cached);
        }

        let response = self
            .http
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let value: Value = check_status(response).await?.json().await?;
        self.cache.insert(cache_key, value.clone()).await;
        Ok(value)
    }

    /// POST a text body and decode the JSON answer.
    ///
    /// `cache_body` enables caching keyed on the body (DSL queries are pure reads).
    pub(crate) async fn post_json(
        &self,
        url: &str,
        body: String,
        content_type: &str,
        authorization: Option<&str>,
        cache_body: bool,
    ) -> ClientResult<Value> {
        let cache_key = cache_body.then(|| cache_key("POST", url, &[(String::new(), body.clone())]));
        if let Some(key) = &cache_key {
            if let Some(cached) = self.cache.get(key).await {
                tracing::trace!(url, "cache hit");
                return Ok(cached);
            }
        }

        let mut request = self.http.post(url).header("Content-Type", content_type).body(body);
        if let Some(auth) = authorization {
            request = request.header("Authorization", auth);
        }

        let response = request.send().await.map_err(|e| self.send_error(e))?;
        let value: Value = check_status(response).await?.json().await?;

        if let Some(key) = cache_key {
            self.cache.insert(key, value.clone()).await;
        }
        Ok(value)
    }

    fn send_error(&self, err: reqwest_middleware::Error) -> ClientError {
        match err {
            reqwest_middleware::Error::Reqwest(e) if e.is_timeout() => {
                ClientError::Timeout(self.timeout)
            }
            other => ClientError::Middleware(other),
        }
    }
}

/// Map API status codes to client errors.
pub(crate) async fn check_status(response: reqwest::Response) -> ClientResult<reqwest::Response> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    match status.as_u16() {
        429 => {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);

            Err(ClientError::rate_limited(retry_after))
        }
        401 | 403 => Err(ClientError::unauthorized(error_message(response).await)),
        404 => Err(ClientError::not_found(error_message(response).await)),
        400 => Err(ClientError::bad_request(error_message(response).await)),
        500..=599 => Err(ClientError::server(status.as_u16(), error_message(response).await)),
        code => Err(ClientError::UnexpectedStatus {
            status: code,
            message: error_message(response).await,
        }),
    }
}

/// Pull a readable message out of an error body (`message`, `error`, or raw text).
async fn error_message(response: reqwest::Response) -> String {
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<Value>(&text) {
        Ok(body) => ["message", "error", "errors"]
            .iter()
            .find_map(|k| match body.get(*k) {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Null) | None => None,
                Some(other) => Some(other.to_string()),
            })
            .unwrap_or(text),
        Err(_) => text,
    }
}

/// Cache key: md5 over `method|url|k=v&...`.
pub(crate) fn cache_key(method: &str, url: &str, params: &[(String, String)]) -> String {
    use md5::{Digest, Md5};

    let mut hasher = Md5::new();
    hasher.update(method.as_bytes());
    hasher.update(b"|");
    hasher.update(url.as_bytes());
    hasher.update(b"|");

    for (k, v) in params {
        hasher.update(k.as_bytes());
        hasher.update(b"=");
        hasher.update(v.as_bytes());
        hasher.update(b"&");
    }

    format!("{:x}", hasher.finalize())
}
