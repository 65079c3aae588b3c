//! Error types for chunked collections.
//!
//! Two families of failure exist:
//!
//! - [`DatasetError`] is what a [`Dataset`](crate::Dataset) reports for a
//!   failed one-shot query or a broken live listener.
//! - [`Error`] is what a collection surfaces to its caller. Remote failures
//!   are wrapped with the operation that observed them so the caller can tell
//!   a failed page fetch from a failed subscription.
//!
//! None of these are fatal. A failed fetch clears the in-flight flag so
//! `load_more` can be issued again, and a failed subscription leaves the
//! affected chunk at its last-known snapshot.

use core::fmt;

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Coarse classification of a remote failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCode {
    /// The service could not be reached or is temporarily down.
    Unavailable,
    /// The caller is not allowed to read the requested range.
    PermissionDenied,
    /// The request or listener was cancelled remotely.
    Cancelled,
    /// Anything else the service reports.
    Internal,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Unavailable => write!(f, "unavailable"),
            ErrorCode::PermissionDenied => write!(f, "permission-denied"),
            ErrorCode::Cancelled => write!(f, "cancelled"),
            ErrorCode::Internal => write!(f, "internal"),
        }
    }
}

/// A failure reported by the remote dataset service.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct DatasetError {
    pub code: ErrorCode,
    pub message: String,
}

impl DatasetError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unavailable, message)
    }
}

/// Which live subscription reported a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscriptionTarget {
    /// The live range listener of the chunk at this index.
    Chunk(usize),
    /// The one-item probe past the current boundary.
    Availability,
}

impl fmt::Display for SubscriptionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionTarget::Chunk(index) => write!(f, "chunk {index}"),
            SubscriptionTarget::Availability => write!(f, "availability probe"),
        }
    }
}

/// Unified error type for chunked collections.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// A one-shot page fetch failed. Safe to retry with `load_more`.
    #[error("Page fetch failed: {0}")]
    Fetch(#[source] DatasetError),

    /// A live listener reported an error. The chunk keeps its last snapshot.
    #[error("Subscription error on {target}: {source}")]
    Subscription {
        target: SubscriptionTarget,
        #[source]
        source: DatasetError,
    },

    /// The caller supplied parameters the collection cannot work with.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// The collection has been closed and its event loop is gone.
    #[error("Collection is detached")]
    Detached,
}
