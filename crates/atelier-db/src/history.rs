//! # Full-History Cache
//!
//! Advanced report filters need the complete sale history rather than a
//! period slice. The load is asynchronous and not cancellable; this cache
//! is the one-shot "already loaded" guard that prevents duplicate
//! concurrent fetches of the same dataset.
//!
//! Concurrent callers share a single load: the first caller runs the
//! query, the rest await the same cell and receive the cached slice.

use tokio::sync::OnceCell;

use crate::error::DbResult;
use crate::repository::sale::SaleRepository;
use atelier_core::Sale;

/// One-shot cache of the full sale history.
///
/// ## Usage
/// ```rust,ignore
/// let cache = FullHistoryCache::new();
/// let sales = cache.sales(&db.sales()).await?; // loads once
/// let again = cache.sales(&db.sales()).await?; // cached, no query
/// ```
///
/// The cache holds a snapshot; recreate it to pick up new records.
#[derive(Debug, Default)]
pub struct FullHistoryCache {
    sales: OnceCell<Vec<Sale>>,
}

impl FullHistoryCache {
    /// Creates an empty (not yet loaded) cache.
    pub fn new() -> Self {
        FullHistoryCache {
            sales: OnceCell::new(),
        }
    }

    /// Returns the full sale history, loading it on first call.
    ///
    /// A failed load leaves the cell empty so a later call can retry.
    pub async fn sales(&self, repo: &SaleRepository) -> DbResult<&[Sale]> {
        let sales = self
            .sales
            .get_or_try_init(|| async { repo.list_all().await })
            .await?;
        Ok(sales.as_slice())
    }

    /// Whether the history has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.sales.initialized()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
