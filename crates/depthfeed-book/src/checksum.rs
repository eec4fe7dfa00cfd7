//! CRC32 checksum over the visible window
//!
//! Gives a remote mirror a cheap way to confirm it matches the book.
//!
//! # Algorithm
//!
//! 1. Process asks first (best to worst), then bids (best to worst)
//! 2. For each level: format price and size with fixed precision, remove
//!    the decimal point, strip leading zeros
//! 3. Feed every string to a standard CRC32 (ISO 3309, polynomial 0xEDB88320)

use crc32fast::Hasher;
use depthfeed_types::PriceLevel;

/// Default price precision (decimal places)
pub const DEFAULT_PRICE_PRECISION: u8 = 8;

/// Default size precision (decimal places)
pub const DEFAULT_SIZE_PRECISION: u8 = 8;

/// Compute the window checksum with explicit precision
///
/// # Arguments
///
/// * `asks` - Ask levels, best (lowest) first
/// * `bids` - Bid levels, best (highest) first
/// * `price_precision` - Decimal places kept for prices
/// * `size_precision` - Decimal places kept for sizes
pub fn window_checksum_with_precision(
    asks: &[PriceLevel],
    bids: &[PriceLevel],
    price_precision: u8,
    size_precision: u8,
) -> u32 {
    let mut hasher = Hasher::new();

    for level in asks.iter().chain(bids) {
        hasher.update(format_for_checksum(level.price, price_precision).as_bytes());
        hasher.update(format_for_checksum(level.size, size_precision).as_bytes());
    }

    hasher.finalize()
}

/// Compute the window checksum with default precision
pub fn window_checksum(asks: &[PriceLevel], bids: &[PriceLevel]) -> u32 {
    window_checksum_with_precision(asks, bids, DEFAULT_PRICE_PRECISION, DEFAULT_SIZE_PRECISION)
}

/// Format a value with `precision` decimals, drop the point and leading zeros
///
/// With precision=2:
/// - 10.5 → "10.50" → "1050"
/// - 0.07 → "0.07" → "007" → "7"
fn format_for_checksum(value: f64, precision: u8) -> String {
    let formatted = format!("{:.prec$}", value, prec = precision as usize);
    let without_decimal = formatted.replace('.', "");
    let trimmed = without_decimal.trim_start_matches('0');

    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
