use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{RefreshChannel, RefreshError};
use crate::types::FeatureSet;

/// The mutable cache state, guarded by a single mutex.
///
/// The lock is only ever held for short, non-awaiting critical sections.
/// Waiting for an in-flight refresh happens on a clone of the channel,
/// outside the lock.
#[derive(Default)]
struct CacheState {
    features: FeatureSet,
    last_updated: Option<Instant>,
    refresh: Option<RefreshChannel>,
}

/// In-memory store for the most recently known feature set.
///
/// The cache starts empty and expired. It is only ever written by the
/// refresh completion path via [`install`](Self::install); the single slot
/// for the in-flight refresh cycle also lives here so that readers can
/// observe it.
pub struct FeatureCache {
    state: Mutex<CacheState>,
    ttl: Duration,
}

impl fmt::Debug for FeatureCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock().unwrap();
        f.debug_struct("FeatureCache")
            .field("features", &state.features.len())
            .field("last_updated", &state.last_updated)
            .field("refresh in flight", &state.refresh.is_some())
            .finish()
    }
}

impl FeatureCache {
    /// Creates an empty cache whose contents expire `ttl` after installation.
    pub fn new(ttl: Duration) -> Self {
        FeatureCache {
            state: Mutex::new(CacheState::default()),
            ttl,
        }
    }

    /// Whether the cached feature set should be considered stale.
    ///
    /// True until the first install, and again once the TTL has elapsed
    /// since the most recent one. Non-blocking.
    pub fn is_expired(&self) -> bool {
        let state = self.state.lock().unwrap();
        match state.last_updated {
            Some(last_updated) => last_updated.elapsed() > self.ttl,
            None => true,
        }
    }

    /// The number of currently installed feature definitions.
    pub fn feature_count(&self) -> usize {
        self.state.lock().unwrap().features.len()
    }

    /// Atomically replaces the installed feature set and restarts the TTL.
    pub fn install(&self, features: FeatureSet) {
        let mut state = self.state.lock().unwrap();
        state.features = features;
        state.last_updated = Some(Instant::now());
    }

    /// Returns the currently installed feature set.
    ///
    /// If a refresh is in flight, this suspends until that cycle has
    /// settled and then returns whatever is installed at that point, which
    /// is still the previous set if the cycle failed. It never starts a
    /// refresh on its own.
    ///
    /// Returns [`RefreshError::Cancelled`] if `ct` fires while waiting; the
    /// cache state is left untouched in that case.
    pub async fn get_features(&self, ct: &CancellationToken) -> Result<FeatureSet, RefreshError> {
        let in_flight = self.state.lock().unwrap().refresh.clone();

        if let Some(channel) = in_flight {
            tokio::select! {
                _ = ct.cancelled() => return Err(RefreshError::Cancelled),
                // The cycle outcome is deliberately ignored here: a failed
                // refresh leaves the previous set in place, and that set is
                // the answer.
                _ = channel => {}
            }
        }

        Ok(self.snapshot())
    }

    /// The installed feature set, without suspending on an in-flight refresh.
    pub(crate) fn snapshot(&self) -> FeatureSet {
        self.state.lock().unwrap().features.clone()
    }

    /// Installs `channel` as the in-flight refresh cycle.
    ///
    /// Returns the already-running cycle instead if there is one; the caller
    /// must then join that cycle rather than spawn a fetch of its own.
    pub(super) fn begin_refresh(&self, channel: RefreshChannel) -> Option<RefreshChannel> {
        let mut state = self.state.lock().unwrap();
        match state.refresh {
            Some(ref in_flight) => Some(in_flight.clone()),
            None => {
                state.refresh = Some(channel);
                None
            }
        }
    }

    /// Clears the in-flight slot at the end of a cycle.
    ///
    /// This runs before the outcome is sent, so that callers either hold a
    /// channel that will still yield the outcome, or find no channel at all
    /// and may start a fresh cycle.
    pub(super) fn finish_refresh(&self) {
        self.state.lock().unwrap().refresh = None;
    }
}
