//! Connection and book configuration

use depthfeed_types::{FeedError, Source, SubscriptionKey, Symbol};
use serde::{Deserialize, Serialize};

/// Visible depth used when a book is created without an explicit depth
pub const DEFAULT_DEPTH: u32 = 10;

/// Configuration for a feed connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Maximum number of live books (None = unlimited)
    pub max_books: Option<usize>,
    /// Depth for books created without one (0 = unbounded)
    pub default_depth: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_books: None,
            default_depth: DEFAULT_DEPTH,
        }
    }
}

impl ConnectionConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the number of live books
    pub fn with_max_books(mut self, max_books: usize) -> Self {
        self.max_books = Some(max_books);
        self
    }

    /// Set the depth used by [`create_book_default`](crate::FeedConnection::create_book_default)
    pub fn with_default_depth(mut self, depth: u32) -> Self {
        self.default_depth = depth;
        self
    }

    /// Parse a config from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, FeedError> {
        serde_json::from_str(json).map_err(|e| FeedError::Configuration(e.to_string()))
    }
}

/// Parameters for one book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookConfig {
    /// Instrument symbol
    pub symbol: String,
    /// Liquidity source (empty = composite)
    #[serde(default)]
    pub source: String,
    /// Visible depth per side (None = connection default)
    #[serde(default)]
    pub depth: Option<u32>,
}

impl BookConfig {
    /// Create a composite-source book config
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            source: String::new(),
            depth: None,
        }
    }

    /// Scope the book to one liquidity source
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Set the visible depth (0 = unbounded)
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = Some(depth);
        self
    }

    /// Validated subscription key
    pub fn key(&self) -> Result<SubscriptionKey, FeedError> {
        let symbol = Symbol::new(self.symbol.as_str())?;
        Ok(SubscriptionKey::new(symbol, Source::new(self.source.as_str())))
    }
}
