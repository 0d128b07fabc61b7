use std::sync::Arc;

use futures::channel::oneshot;
use futures::future::FutureExt;
use tokio_util::sync::CancellationToken;

use super::{FeatureCache, RefreshChannel, RefreshError, RefreshOutcome};
use crate::fetch::FetchFeatures;
use crate::utils::futures::CallOnDrop;

/// A handle to a refresh cycle.
///
/// Dropping the handle does not abort the cycle; the fetch keeps running in
/// the background and installs its result whether or not anybody waits.
pub struct Refresh {
    channel: RefreshChannel,
    ct: CancellationToken,
    started: bool,
}

impl Refresh {
    /// Whether this handle started the cycle, as opposed to joining one that
    /// was already in flight.
    pub fn started(&self) -> bool {
        self.started
    }

    /// Waits until the cycle has settled and returns its outcome.
    ///
    /// Cancelling the token that was passed to
    /// [`RefreshWorker::refresh_cache_from_api`] aborts only this wait;
    /// other observers of the same cycle are unaffected unless this handle
    /// is the one that started it.
    pub async fn wait(self) -> RefreshOutcome {
        let Refresh { channel, ct, .. } = self;

        tokio::select! {
            _ = ct.cancelled() => Err(RefreshError::Cancelled),
            outcome = channel => {
                // The sender is dropped without a value only when the cycle
                // task was torn down, which reads as a cancellation.
                outcome.unwrap_or(Err(RefreshError::Cancelled))
            }
        }
    }
}

/// Performs fetch-and-install cycles against a [`FeatureCache`].
///
/// At most one fetch is in flight at any time: a refresh request either
/// starts a new cycle or attaches to the running one as another observer.
pub struct RefreshWorker {
    cache: Arc<FeatureCache>,
    fetcher: Arc<dyn FetchFeatures>,
    shutdown: CancellationToken,
}

impl RefreshWorker {
    pub fn new(cache: Arc<FeatureCache>, fetcher: Arc<dyn FetchFeatures>) -> Self {
        RefreshWorker {
            cache,
            fetcher,
            shutdown: CancellationToken::new(),
        }
    }

    /// Starts a fetch-and-install cycle, or joins the one in flight.
    ///
    /// This is deliberately not an `async fn`: the cycle is spawned eagerly
    /// so that it proceeds whether or not the returned handle is awaited.
    ///
    /// The caller's `ct` bounds the wait on the returned handle. For the
    /// caller that starts the cycle it is additionally propagated into the
    /// fetch itself, so that initiator cancellation abandons the fetch for
    /// everyone while a joiner's cancellation only releases that joiner.
    pub fn refresh_cache_from_api(&self, ct: &CancellationToken) -> Refresh {
        if self.shutdown.is_cancelled() {
            // The worker is shut down and never goes back to the network.
            // Hand out an already-settled cycle instead.
            let (sender, receiver) = oneshot::channel();
            sender.send(Err(RefreshError::Cancelled)).ok();
            return Refresh {
                channel: receiver.shared(),
                ct: ct.clone(),
                started: false,
            };
        }

        let (sender, receiver) = oneshot::channel();
        let channel = receiver.shared();

        match self.cache.begin_refresh(channel.clone()) {
            Some(in_flight) => {
                tracing::debug!("Joining the refresh cycle already in flight");
                Refresh {
                    channel: in_flight,
                    ct: ct.clone(),
                    started: false,
                }
            }
            None => {
                self.spawn_cycle(sender, ct.clone());
                Refresh {
                    channel,
                    ct: ct.clone(),
                    started: true,
                }
            }
        }
    }

    /// Cancels the in-flight refresh, if any, and shuts the worker down.
    ///
    /// This is terminal: subsequent refresh requests on this worker fail
    /// fast with [`RefreshError::Cancelled`] instead of attempting network
    /// access. Idempotent.
    pub fn cancel(&self) {
        self.shutdown.cancel();
    }

    fn spawn_cycle(&self, sender: oneshot::Sender<RefreshOutcome>, ct: CancellationToken) {
        let cache = Arc::clone(&self.cache);
        let fetcher = Arc::clone(&self.fetcher);
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            let finish = CallOnDrop::new({
                let cache = Arc::clone(&cache);
                move || cache.finish_refresh()
            });

            let outcome = tokio::select! {
                _ = shutdown.cancelled() => Err(RefreshError::Cancelled),
                _ = ct.cancelled() => Err(RefreshError::Cancelled),
                outcome = fetcher.fetch_features(&ct) => outcome,
            };

            match &outcome {
                Ok(features) => {
                    tracing::debug!(
                        count = features.len(),
                        "Refresh succeeded, installing the fetched feature set"
                    );
                    cache.install(Arc::clone(features));
                }
                Err(error) => {
                    // The previous feature set stays installed; for callers
                    // on the read path stale data beats no data.
                    tracing::debug!(
                        error = error as &dyn std::error::Error,
                        "Refresh did not complete"
                    );
                }
            }

            // Clear the slot first, so that late callers either hold a
            // channel that still yields this outcome, or start a new cycle.
            drop(finish);
            sender.send(outcome).ok();
        });
    }
}
