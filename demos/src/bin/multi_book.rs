//! Demo 2: Multi-Book Monitor
//!
//! Showcases: one connection owning several (symbol, source) books fed
//! concurrently, per-book spread tracking, handle lifecycle
//!
//! Run: cargo run --bin multi_book

use colored::*;
use depthfeed_client::{BookConfig, ConnectionConfig, FeedConnection, LocalOrderChannel};
use depthfeed_demos::{init_tracing, OrderFlow};
use depthfeed_types::FeedError;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const BOOKS: &[(&str, &str, f64)] = &[
    ("AAPL", "", 190.0),
    ("AAPL", "NTV", 190.0),
    ("MSFT", "", 410.0),
    ("/ESZ6", "", 5_200.0),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    println!("{}", "═".repeat(65).cyan());
    println!("{}", "  MULTI-BOOK MONITOR".cyan().bold());
    println!("{}", "  depthfeed Demo - Concurrent Books on One Connection".cyan());
    println!("{}", "═".repeat(65).cyan());
    println!();

    let config = ConnectionConfig::new()
        .with_max_books(BOOKS.len())
        .with_default_depth(5);
    let channel = LocalOrderChannel::shared();
    let conn = Arc::new(FeedConnection::new(channel.clone(), config));

    let mut handles = Vec::new();
    for (symbol, source, _) in BOOKS {
        let handle = conn.create_book_with(&BookConfig::new(*symbol).with_source(*source))?;
        let book = conn.book(handle)?;
        println!("{} {:<12} handle {}", "✓".green(), book.key().to_string(), handle);
        handles.push(handle);
    }

    // The connection is full now
    match conn.create_book("TSLA", "", 5) {
        Err(FeedError::CapacityExceeded { max_books }) => {
            println!("{} TSLA rejected: limit of {} books", "✗".yellow(), max_books);
        }
        other => println!("{} unexpected: {:?}", "?".red(), other),
    }
    println!();

    let feeders: Vec<_> = BOOKS
        .iter()
        .enumerate()
        .map(|(i, (symbol, source, mid))| {
            let channel = channel.clone();
            let config = BookConfig::new(*symbol).with_source(*source);
            let mid = *mid;
            tokio::spawn(async move {
                let key = config.key()?;
                let mut flow = OrderFlow::new(i as u64 + 1, mid, 0.25);
                channel.publish(&key, &flow.snapshot(200), true);
                let mut ticker = tokio::time::interval(Duration::from_millis(1));
                for _ in 0..2_000 {
                    ticker.tick().await;
                    let batch = flow.next_batch(6);
                    channel.publish(&key, &batch, false);
                }
                Ok::<_, FeedError>(())
            })
        })
        .collect();

    println!(
        "  {:<12}  {:>10}  {:>10}  {:>8}  {:>8}",
        "BOOK".white().bold(),
        "BID".white().bold(),
        "ASK".white().bold(),
        "SPREAD".white().bold(),
        "ORDERS".white().bold()
    );
    println!("  {}", "─".repeat(56));

    for _ in 0..5 {
        tokio::time::sleep(Duration::from_millis(400)).await;
        for handle in &handles {
            let book = conn.book(*handle)?;
            let snapshot = book.snapshot();
            let fmt = |p: Option<f64>| p.map(|p| format!("{:.2}", p)).unwrap_or_else(|| "-".into());
            println!(
                "  {:<12}  {:>10}  {:>10}  {:>8}  {:>8}",
                book.key().to_string(),
                fmt(snapshot.best_bid_price()).green(),
                fmt(snapshot.best_ask_price()).red(),
                fmt(snapshot.spread()),
                book.order_count()
            );
        }
        println!();
    }

    for feeder in feeders {
        feeder.await??;
    }

    // Closing a book invalidates its handle for good
    let first = handles[0];
    conn.close_book(first);
    match conn.book(first) {
        Err(e) => println!("{} {} after close: {}", "✓".green(), first, e),
        Ok(_) => println!("{} {} still live", "?".red(), first),
    }

    let closed = conn.close();
    info!(closed, "Connection closed");
    println!("{} Closed {} remaining books", "✓".green(), closed);
    Ok(())
}
