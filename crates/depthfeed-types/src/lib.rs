//! Shared types for the depthfeed order-book client
//!
//! This crate provides the core type definitions used across the workspace.
//! It has minimal dependencies and can be used independently.
//!
//! # Key Types
//!
//! - [`RawOrderEvent`] - A decoded order add/update/remove from the feed
//! - [`OrderContribution`] - Last live state of an order
//! - [`PriceLevel`], [`LevelDelta`] - Aggregated levels and signed changes
//! - [`Side`], [`BookSide`] - Order side and book side
//! - [`Symbol`], [`Source`] - Subscription scope
//! - [`FeedError`] - Error types

pub mod enums;
pub mod error;
pub mod level;
pub mod order;
pub mod symbol;

// Re-export commonly used types
pub use enums::*;
pub use error::*;
pub use level::*;
pub use order::*;
pub use symbol::*;
