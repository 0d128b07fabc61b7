//! The public entry point of the retrieval core.

use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use crate::caching::{FeatureCache, RefreshError, RefreshWorker};
use crate::config::Config;
use crate::fetch::HttpFeatureFetcher;
use crate::types::{FeatureSet, RetrievalOptions};

/// Decides, per call, whether features come from the cache or the network.
///
/// The repository never writes to the cache itself; all writes go through
/// the refresh worker. There is no hidden global state: every repository
/// owns its cache and worker, so multiple instances coexist in one process.
pub struct FeatureRepository {
    cache: Arc<FeatureCache>,
    worker: RefreshWorker,
}

impl FeatureRepository {
    /// Creates a repository from an explicitly wired cache and worker.
    pub fn new(cache: Arc<FeatureCache>, worker: RefreshWorker) -> Self {
        FeatureRepository { cache, worker }
    }

    /// Creates a repository serving the features endpoint named by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher = Arc::new(HttpFeatureFetcher::new(config)?);
        let cache = Arc::new(FeatureCache::new(config.cache_ttl));
        let worker = RefreshWorker::new(Arc::clone(&cache), fetcher);
        Ok(Self::new(cache, worker))
    }

    /// Returns the current feature set according to `options`.
    ///
    /// When the cache is stale or a refresh is forced, a refresh cycle is
    /// started (or joined, if one is already in flight). The call then waits
    /// for that cycle if the cache has never been populated or
    /// `wait_for_completion` is set, propagating the cycle's failure or
    /// cancellation. Otherwise the cached (possibly stale) set is returned,
    /// and the refresh resolves in the background.
    pub async fn get_features(
        &self,
        options: &RetrievalOptions,
        ct: &CancellationToken,
    ) -> Result<FeatureSet, RefreshError> {
        let expired = self.cache.is_expired();

        if expired || options.force_refresh {
            tracing::debug!(
                expired,
                force_refresh = options.force_refresh,
                "Refreshing the feature cache from the API"
            );

            let refresh = self.worker.refresh_cache_from_api(ct);

            if self.cache.feature_count() == 0 || options.wait_for_completion {
                tracing::debug!(
                    feature_count = self.cache.feature_count(),
                    wait_for_completion = options.wait_for_completion,
                    "Waiting for the refresh cycle to resolve"
                );
                return refresh.wait().await;
            }

            if refresh.started() {
                // This call initiated the cycle and nobody asked to wait:
                // hand out the stale snapshot right away while the fetch
                // resolves in the background.
                return Ok(self.cache.snapshot());
            }
            // Joined a cycle that was already in flight; fall through and
            // wait for it to settle like any other reader.
        }

        self.cache.get_features(ct).await
    }

    /// [`get_features`](Self::get_features) with default options and no
    /// caller-side cancellation.
    pub async fn latest_features(&self) -> Result<FeatureSet, RefreshError> {
        self.get_features(&RetrievalOptions::default(), &CancellationToken::new())
            .await
    }

    /// Cancels any in-flight refresh and shuts the worker down.
    ///
    /// After this the repository serves cached data only; callers that need
    /// fresh data again have to build a new repository. Idempotent.
    pub fn cancel(&self) {
        self.worker.cancel();
    }
}
