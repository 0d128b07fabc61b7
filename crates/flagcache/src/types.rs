use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A single feature definition.
///
/// The retrieval core never interprets definitions. They are opaque JSON
/// payloads owned by the evaluation layer of the embedding application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Feature(pub serde_json::Value);

/// The complete set of known feature definitions, keyed by feature name.
///
/// A feature set is immutable once installed: a refresh replaces it
/// wholesale, it is never merged into. Readers share it via cheap `Arc`
/// clones.
pub type FeatureSet = Arc<BTreeMap<String, Feature>>;

/// Per-call options for
/// [`FeatureRepository::get_features`](crate::repository::FeatureRepository::get_features).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetrievalOptions {
    /// Kick off a refresh even if the cached feature set has not expired yet.
    pub force_refresh: bool,
    /// Block until a refresh triggered by this call has resolved.
    pub wait_for_completion: bool,
}
