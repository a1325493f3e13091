//! Pipeline error types.

use thiserror::Error;

/// Error from a concrete position backend.
///
/// The acquisition chain treats a backend error like an empty answer and
/// moves on to the next strategy, so this type mostly feeds logs.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct PositionError(String);

impl PositionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<reqwest::Error> for PositionError {
    fn from(err: reqwest::Error) -> Self {
        Self(err.to_string())
    }
}

/// Outcome of the position acquisition fallback chain.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocationError {
    #[error("no position fix available")]
    Unavailable,

    #[error("position request cancelled")]
    Cancelled,
}

impl LocationError {
    /// Fixed message shown on the weather card. The sync loop returns
    /// before publishing on cancellation, so only the `Unavailable`
    /// message ever reaches the card.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Unavailable => "GPS signal lost. Ensure location is on.",
            Self::Cancelled => "Location request was interrupted.",
        }
    }
}

/// Weather retrieval errors. Every variant maps to the same card message;
/// the underlying cause is kept for logs only.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("weather API key is not configured")]
    NoApiKey,

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("weather service returned {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed weather response: {0}")]
    Decode(String),
}

impl FetchError {
    /// Fixed message shown on the weather card
    pub fn user_message(&self) -> &'static str {
        "Failed to load weather. Check connection."
    }
}
