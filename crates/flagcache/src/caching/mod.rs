//! # Feature caching and refresh coordination
//!
//! This module contains the two lower layers of the retrieval core:
//!
//! - [`FeatureCache`], the in-memory store for the most recently fetched
//!   feature set. Staleness is evaluated lazily on read against a configured
//!   TTL; there is no background timer.
//! - [`RefreshWorker`], which fetches a fresh feature set and installs it
//!   into the cache. Concurrent refresh requests are coalesced into a single
//!   fetch: the first caller starts a cycle, everyone else attaches to the
//!   same broadcast-once channel and observes the same outcome.
//!
//! A refresh cycle walks `Idle → Fetching → {Installed | Failed | Cancelled}
//! → Idle`, and only one cycle occupies `Fetching` at a time. The in-flight
//! cycle is tracked in a single slot inside the cache state, so that readers
//! can suspend on it and the worker can guarantee at most one fetch at a
//! time.
//!
//! Failures never clear the cache: callers on the read path keep being
//! served the last-known-good set, and only callers that explicitly awaited
//! the failed cycle see its [`RefreshError`].

use futures::channel::oneshot;
use futures::future::Shared;

mod error;
mod memory;
mod refresh;


pub use error::RefreshError;
pub use memory::FeatureCache;
pub use refresh::{Refresh, RefreshWorker};

use crate::types::FeatureSet;

/// The outcome of a refresh cycle, shared by all of its observers.
pub type RefreshOutcome = Result<FeatureSet, RefreshError>;

// The inner channel is necessary because `Shared` hands out clones of the
// output; both the feature set (an `Arc`) and the error are cheap to clone.
pub(crate) type RefreshChannel = Shared<oneshot::Receiver<RefreshOutcome>>;
