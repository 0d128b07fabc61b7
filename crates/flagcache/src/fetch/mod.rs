//! Retrieval of feature definitions from a remote source.
//!
//! The retrieval core only requires that a fetch is asynchronous,
//! cancellable, and can fail; everything transport-specific lives behind
//! the [`FetchFeatures`] seam.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::caching::RefreshError;
use crate::types::FeatureSet;

mod http;

pub use http::HttpFeatureFetcher;

/// The user agent sent with outgoing fetch requests.
pub const USER_AGENT: &str = concat!("flagcache/", env!("CARGO_PKG_VERSION"));

/// A remote source of feature definitions.
#[async_trait]
pub trait FetchFeatures: Send + Sync + 'static {
    /// Fetches the complete current feature set from the remote source.
    ///
    /// Cancelling `ct` abandons the fetch and yields
    /// [`RefreshError::Cancelled`].
    async fn fetch_features(&self, ct: &CancellationToken) -> Result<FeatureSet, RefreshError>;
}

impl From<reqwest::Error> for RefreshError {
    fn from(error: reqwest::Error) -> Self {
        Self::fetch_error(&error)
    }
}
