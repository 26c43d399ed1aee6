//! Feed error types

use thiserror::Error;

/// Failure to open or continue reading a pipeline feed
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct FeedError {
    pub kind: FeedErrorKind,
    pub message: String,
}

impl FeedError {
    pub fn new(kind: FeedErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(FeedErrorKind::Connect, message)
    }

    pub fn http(message: impl Into<String>) -> Self {
        Self::new(FeedErrorKind::Http, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(FeedErrorKind::Decode, message)
    }

    pub fn interrupted(message: impl Into<String>) -> Self {
        Self::new(FeedErrorKind::Interrupted, message)
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedErrorKind {
    /// Pipeline unreachable
    Connect,
    /// Pipeline answered with a non-success status
    Http,
    /// A frame could not be decoded
    Decode,
    /// The feed terminated mid-stream
    Interrupted,
}

impl FeedErrorKind {
    /// Whether the feed may still yield events after this error
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Decode)
    }
}
