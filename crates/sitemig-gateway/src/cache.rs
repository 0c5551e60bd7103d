//! Listing cache using moka
//!
//! Holds the full remote listing of one collection per facility. Entries are
//! fetched lazily and dropped on invalidation; the next read refetches.

use moka::future::Cache;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Cached listing of `T`, keyed by facility id
pub struct ListingCache<T> {
    inner: Cache<String, Arc<Vec<T>>>,
}

impl<T> Clone for ListingCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for ListingCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListingCache").finish_non_exhaustive()
    }
}

impl<T> ListingCache<T>
where
    T: Send + Sync + 'static,
{
    /// Create empty cache
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Cache::new(64),
        }
    }

    /// Cached listing, if present
    #[inline]
    pub async fn get(&self, facility: &str) -> Option<Arc<Vec<T>>> {
        self.inner.get(facility).await
    }

    /// Cached listing, fetching it with `fetch` on a miss
    ///
    /// # Errors
    /// Propagates the error from `fetch`; nothing is cached in that case
    pub async fn try_get_or_fetch<E, F, Fut>(&self, facility: &str, fetch: F) -> Result<Arc<Vec<T>>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T>, E>>,
    {
        if let Some(cached) = self.get(facility).await {
            return Ok(cached);
        }

        let listing = Arc::new(fetch().await?);
        self.inner.insert(facility.to_string(), listing.clone()).await;
        Ok(listing)
    }

    /// Drop the listing for `facility`
    #[inline]
    pub async fn invalidate(&self, facility: &str) {
        self.inner.invalidate(facility).await;
    }
}

impl<T> Default for ListingCache<T>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
