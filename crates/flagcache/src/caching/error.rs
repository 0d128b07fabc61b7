use std::error::Error;

use thiserror::Error;

/// An error produced by a feature refresh cycle.
///
/// The same value is broadcast to every caller awaiting the cycle, which is
/// why this is `Clone` and compares by value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// The remote source could not be reached, or answered with a
    /// non-success status.
    #[error("feature fetch failed: {0}")]
    Fetch(String),
    /// The remote source answered, but the payload was not a valid feature
    /// envelope.
    #[error("malformed feature payload: {0}")]
    Malformed(String),
    /// The wait was cancelled, or the worker was shut down.
    #[error("refresh cancelled")]
    Cancelled,
}

impl RefreshError {
    /// Creates a [`Fetch`](Self::Fetch) error from the root cause of `error`.
    ///
    /// Transport errors tend to wrap the interesting message several layers
    /// deep; keep only the innermost one.
    pub fn fetch_error(mut error: &dyn Error) -> Self {
        while let Some(source) = error.source() {
            error = source;
        }

        Self::Fetch(error.to_string())
    }
}
