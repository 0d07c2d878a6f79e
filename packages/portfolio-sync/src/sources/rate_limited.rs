//! Rate-limited source wrapper.
//!
//! Wraps any ContentSource implementation with rate limiting using the
//! governor crate. Drive quotas are per user, so one limiter is shared by
//! every call made through the wrapper (and its clones).

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::SourceResult;
use crate::traits::source::{ContentSource, SheetSource, SheetValues};
use crate::types::{
    config::SheetRef,
    item::{ExportFormat, SourceEntry},
};

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// A source wrapper that waits for a permit before every remote call.
pub struct RateLimitedSource<C> {
    inner: C,
    limiter: Arc<DefaultRateLimiter>,
}

impl<C> RateLimitedSource<C> {
    /// Create a new rate-limited source.
    ///
    /// A rate of zero is treated as one request per second.
    pub fn new(source: C, requests_per_second: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_second).unwrap_or(nonzero!(1u32));
        Self::with_quota(source, Quota::per_second(rate))
    }

    /// Create with a custom quota.
    pub fn with_quota(source: C, quota: Quota) -> Self {
        Self {
            inner: source,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Create with burst support.
    pub fn with_burst(source: C, requests_per_second: u32, burst: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_second).unwrap_or(nonzero!(1u32));
        let burst = NonZeroU32::new(burst).unwrap_or(rate);
        Self::with_quota(source, Quota::per_second(rate).allow_burst(burst))
    }

    /// Get a reference to the wrapped source.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    async fn wait_for_permit(&self) {
        self.limiter.until_ready().await;
    }
}

impl<C: Clone> Clone for RateLimitedSource<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: Arc::clone(&self.limiter),
        }
    }
}

#[async_trait]
impl<C: ContentSource> ContentSource for RateLimitedSource<C> {
    async fn list_children(&self, folder_id: &str) -> SourceResult<Vec<SourceEntry>> {
        self.wait_for_permit().await;
        self.inner.list_children(folder_id).await
    }

    async fn fetch_text(&self, item_id: &str, format: ExportFormat) -> SourceResult<String> {
        self.wait_for_permit().await;
        self.inner.fetch_text(item_id, format).await
    }

    async fn fetch_bytes(&self, item_id: &str) -> SourceResult<Vec<u8>> {
        self.wait_for_permit().await;
        self.inner.fetch_bytes(item_id).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[async_trait]
impl<C: SheetSource> SheetSource for RateLimitedSource<C> {
    async fn read_sheet(&self, sheet: &SheetRef) -> SourceResult<SheetValues> {
        self.wait_for_permit().await;
        self.inner.read_sheet(sheet).await
    }
}

/// Extension trait for easy rate limiting.
pub trait SourceExt: Sized {
    /// Wrap this source with rate limiting.
    fn rate_limited(self, requests_per_second: u32) -> RateLimitedSource<Self> {
        RateLimitedSource::new(self, requests_per_second)
    }

    /// Wrap with rate limiting and burst support.
    fn rate_limited_with_burst(self, requests_per_second: u32, burst: u32) -> RateLimitedSource<Self> {
        RateLimitedSource::with_burst(self, requests_per_second, burst)
    }
}

impl<C: ContentSource> SourceExt for C {}
