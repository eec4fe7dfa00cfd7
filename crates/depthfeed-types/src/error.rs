//! Error types for depthfeed

use thiserror::Error;

use crate::symbol::SymbolParseError;

/// Main error type for book and connection operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    // === Input Errors ===
    /// Symbol failed validation
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(#[from] SymbolParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    // === Lifecycle Errors ===
    /// Connection was closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// Handle does not refer to a live book (closed, stale, or never issued)
    #[error("Invalid book handle: index {index}, generation {generation}")]
    InvalidHandle { index: u32, generation: u32 },

    /// Book was closed and accepts no further batches
    #[error("Book closed for {key}")]
    BookClosed { key: String },

    // === Subscription Errors ===
    /// The order channel refused the subscription
    #[error("Subscription failed for {key}: {reason}")]
    SubscriptionFailed { key: String, reason: String },

    /// Connection registry is full
    #[error("Book limit reached: at most {max_books} books per connection")]
    CapacityExceeded { max_books: usize },
}

impl FeedError {
    /// Returns true if the handle or book is permanently unusable
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed | Self::InvalidHandle { .. } | Self::BookClosed { .. }
        )
    }

    /// Returns true if retrying the same call later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SubscriptionFailed { .. } | Self::CapacityExceeded { .. }
        )
    }
}

/// Result type alias for depthfeed operations
pub type FeedResult<T> = Result<T, FeedError>;
