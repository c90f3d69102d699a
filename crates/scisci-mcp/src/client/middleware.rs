//! Request pacing shared by every clone of a client.

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next};

/// Token-bucket gate in front of an upstream API.
///
/// Clones share one bucket. A disabled gate never waits. Registered after the
/// retry layer, so every attempt takes a token.
#[derive(Clone, Default)]
pub struct RateGate {
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl RateGate {
    /// Allow `rate` requests per second; `None` or zero disables the gate.
    #[must_use]
    pub fn per_second(rate: Option<u32>) -> Self {
        Self::from_quota(rate.and_then(NonZeroU32::new).map(Quota::per_second))
    }

    /// Allow `rate` requests per minute; `None` or zero disables the gate.
    #[must_use]
    pub fn per_minute(rate: Option<u32>) -> Self {
        Self::from_quota(rate.and_then(NonZeroU32::new).map(Quota::per_minute))
    }

    /// Gate that never waits.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    fn from_quota(quota: Option<Quota>) -> Self {
        Self { limiter: quota.map(|q| Arc::new(RateLimiter::direct(q))) }
    }

    /// Wait until a request may be sent.
    pub async fn wait(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    /// Check if pacing is active.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }
}

impl std::fmt::Debug for RateGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateGate").field("enabled", &self.is_enabled()).finish()
    }
}

#[async_trait::async_trait]
impl Middleware for RateGate {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        self.wait().await;
        next.run(req, extensions).await
    }
}
