//! Errors surfaced by the executor to the processing loop.

use thiserror::Error;

use crate::dispatch::DispatchError;

#[derive(Debug, Error)]
pub enum ProcessError {
    /// Another bot instance is active. The process must terminate.
    #[error("another instance of this bot is active: {0}")]
    FatalConflict(#[source] DispatchError),

    /// A retryable failure outlived the retry budget.
    #[error("gave up after {retries} retries: {source}")]
    RetriesExhausted {
        retries: u32,
        #[source]
        source: DispatchError,
    },

    /// A failure with no retry handling.
    #[error(transparent)]
    Unclassified(DispatchError),
}

impl ProcessError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProcessError::FatalConflict(_))
    }
}
