use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use rayon::prelude::*;

use crate::{
    assets::loader::{Resource, ResourceLoader},
    foundation::error::{StageError, StageResult},
};

/// Outcome of one [`AssetCache::prefetch`] call.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct PrefetchReport {
    /// Distinct URLs requested.
    pub requested: usize,
    /// URLs loaded by this call.
    pub loaded: usize,
    /// URLs already cached (or already known to fail) before this call.
    pub reused: usize,
    /// `(url, message)` for every load that failed in this call.
    pub failed: Vec<(String, String)>,
}

/// Instance-owned cache of decoded resources keyed by final URL.
///
/// Each URL is handed to the loader at most once for the cache's lifetime; failures are
/// remembered and never retried. [`AssetCache::dispose`] releases every entry exactly once.
pub struct AssetCache {
    loader: Arc<dyn ResourceLoader>,
    entries: BTreeMap<String, Arc<Resource>>,
    failures: BTreeMap<String, String>,
    pool: Option<rayon::ThreadPool>,
    loads_attempted: usize,
    disposed: bool,
}

impl std::fmt::Debug for AssetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetCache")
            .field("entries", &self.entries.len())
            .field("failures", &self.failures.len())
            .field("loads_attempted", &self.loads_attempted)
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl AssetCache {
    /// Cache prefetching on rayon's global pool.
    pub fn new(loader: Arc<dyn ResourceLoader>) -> Self {
        Self {
            loader,
            entries: BTreeMap::new(),
            failures: BTreeMap::new(),
            pool: None,
            loads_attempted: 0,
            disposed: false,
        }
    }

    /// Cache prefetching on a dedicated pool; `None` sizes it to the machine.
    pub fn with_threads(
        loader: Arc<dyn ResourceLoader>,
        threads: Option<usize>,
    ) -> StageResult<Self> {
        let mut cache = Self::new(loader);
        cache.pool = Some(build_thread_pool(threads)?);
        Ok(cache)
    }

    /// Load every distinct, not yet seen URL in parallel and wait for all of them.
    ///
    /// Individual failures are logged and recorded; they never fail the call.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn prefetch<'a>(&mut self, urls: impl IntoIterator<Item = &'a str>) -> PrefetchReport {
        let distinct: BTreeSet<&str> = urls.into_iter().collect();
        let mut report = PrefetchReport {
            requested: distinct.len(),
            ..PrefetchReport::default()
        };
        if self.disposed {
            tracing::warn!("prefetch on a disposed asset cache ignored");
            return report;
        }

        let pending: Vec<&str> = distinct
            .into_iter()
            .filter(|u| !self.entries.contains_key(*u) && !self.failures.contains_key(*u))
            .collect();
        report.reused = report.requested - pending.len();
        self.loads_attempted += pending.len();

        let loader = &self.loader;
        let load_all = || {
            pending
                .par_iter()
                .map(|url| (*url, loader.load(url)))
                .collect::<Vec<_>>()
        };
        let results = match &self.pool {
            Some(pool) => pool.install(load_all),
            None => load_all(),
        };

        for (url, result) in results {
            match result {
                Ok(resource) => {
                    self.entries.insert(url.to_owned(), Arc::new(resource));
                    report.loaded += 1;
                }
                Err(e) => {
                    tracing::error!(url, error = %e, "asset prefetch failed");
                    self.failures.insert(url.to_owned(), e.to_string());
                    report.failed.push((url.to_owned(), e.to_string()));
                }
            }
        }
        tracing::debug!(
            requested = report.requested,
            loaded = report.loaded,
            failed = report.failed.len(),
            "prefetch complete"
        );
        report
    }

    /// Cached resource for `url`.
    pub fn get(&self, url: &str) -> Option<Arc<Resource>> {
        self.entries.get(url).cloned()
    }

    /// Recorded failure message for `url`.
    pub fn failure(&self, url: &str) -> Option<&str> {
        self.failures.get(url).map(String::as_str)
    }

    /// Cached resource for `url`, loading it synchronously on first use.
    pub fn get_or_load(&mut self, url: &str) -> StageResult<Arc<Resource>> {
        if self.disposed {
            return Err(StageError::validation("asset cache is disposed"));
        }
        if let Some(r) = self.entries.get(url) {
            return Ok(Arc::clone(r));
        }
        if let Some(msg) = self.failures.get(url) {
            return Err(StageError::asset_load(format!("'{url}' failed earlier: {msg}")));
        }

        self.loads_attempted += 1;
        match self.loader.load(url) {
            Ok(resource) => {
                let resource = Arc::new(resource);
                self.entries.insert(url.to_owned(), Arc::clone(&resource));
                Ok(resource)
            }
            Err(e) => {
                self.failures.insert(url.to_owned(), e.to_string());
                Err(e)
            }
        }
    }

    /// Store a resource loaded outside the cache.
    ///
    /// Returns `false` (and releases the resource) when the cache is already disposed or the
    /// URL is already cached.
    pub fn insert(&mut self, resource: Resource) -> bool {
        if self.disposed {
            tracing::debug!(url = %resource.url, "load completed after dispose; ignored");
            self.loader.release(&resource);
            return false;
        }
        if self.entries.contains_key(&resource.url) {
            self.loader.release(&resource);
            return false;
        }
        self.failures.remove(&resource.url);
        self.entries.insert(resource.url.clone(), Arc::new(resource));
        true
    }

    /// Release every entry and empty the cache. Idempotent.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        let entries = std::mem::take(&mut self.entries);
        let released = entries.len();
        for resource in entries.values() {
            self.loader.release(resource);
        }
        self.failures.clear();
        tracing::debug!(released, "asset cache disposed");
    }

    /// Number of cached resources.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return `true` once [`AssetCache::dispose`] has run.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// URLs handed to the loader so far.
    pub fn loads_attempted(&self) -> usize {
        self.loads_attempted
    }

    /// Cached URLs in sorted order.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl Drop for AssetCache {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn build_thread_pool(threads: Option<usize>) -> StageResult<rayon::ThreadPool> {
    if threads == Some(0) {
        return Err(StageError::validation(
            "prefetch 'threads' must be >= 1 when set",
        ));
    }

    let mut builder =
        rayon::ThreadPoolBuilder::new().thread_name(|i| format!("layerstage-prefetch-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| StageError::validation(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/cache.rs"]
mod tests;
