//! Instrument symbols and liquidity sources

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Instrument symbol (e.g. "AAPL", "/ESZ6")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Create a symbol, rejecting empty or whitespace-only input
    pub fn new(s: impl Into<String>) -> Result<Self, SymbolParseError> {
        let s = s.into();
        if s.is_empty() {
            return Err(SymbolParseError::Empty);
        }
        if s.trim().is_empty() {
            return Err(SymbolParseError::Blank(s));
        }
        Ok(Self(s))
    }

    /// Get the symbol as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Symbol {
    type Err = SymbolParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Symbol {
    type Error = SymbolParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Liquidity source tag scoping which orders belong to a book.
///
/// The empty source is the composite (all sources) book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Source(String);

impl Source {
    /// Create a source tag
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The composite source
    pub fn composite() -> Self {
        Self::default()
    }

    /// Get the source as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for the composite source
    pub fn is_composite(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Source {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Source {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The (symbol, source) pair a book subscribes to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionKey {
    /// Instrument symbol
    pub symbol: Symbol,
    /// Liquidity source
    pub source: Source,
}

impl SubscriptionKey {
    /// Create a new subscription key
    pub fn new(symbol: Symbol, source: Source) -> Self {
        Self { symbol, source }
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.source.is_composite() {
            write!(f, "{}", self.symbol)
        } else {
            write!(f, "{}@{}", self.symbol, self.source)
        }
    }
}

/// Error parsing a symbol
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SymbolParseError {
    #[error("Symbol is empty")]
    Empty,

    #[error("Symbol is only whitespace: {0:?}")]
    Blank(String),
}
