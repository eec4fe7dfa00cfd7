//! Demo 1: Depth Mirror
//!
//! Showcases: bounded-depth windows, incremental diffs, client-side mirror
//! verified by window checksum
//!
//! Run: cargo run --bin depth_mirror -- [depth] [batches]

use colored::*;
use depthfeed_book::{window_checksum, BookMirror};
use depthfeed_client::{BookListeners, ConnectionConfig, FeedConnection, LocalOrderChannel};
use depthfeed_demos::{init_tracing, OrderFlow};
use depthfeed_types::{Source, SubscriptionKey, Symbol};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Default)]
struct Counters {
    new_books: AtomicU64,
    diffs: AtomicU64,
    removals: AtomicU64,
    additions: AtomicU64,
    updates: AtomicU64,
    verified: AtomicU64,
    mismatched: AtomicU64,
    last_checksum: AtomicU64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let depth: u32 = args.next().map(|s| s.parse()).transpose()?.unwrap_or(10);
    let batches: u64 = args.next().map(|s| s.parse()).transpose()?.unwrap_or(5_000);

    println!("{}", "═".repeat(65).cyan());
    println!("{}", "  DEPTH MIRROR".cyan().bold());
    println!("{}", "  depthfeed Demo - Diff Replay Verification".cyan());
    println!("{}", "═".repeat(65).cyan());
    println!();

    let channel = LocalOrderChannel::shared();
    let conn = FeedConnection::new(channel.clone(), ConnectionConfig::new().with_max_books(1));

    let mirror = Arc::new(Mutex::new(BookMirror::new()));
    let counters = Arc::new(Counters::default());

    // Lock order is always book then mirror: listeners run under the book lock
    let listeners = {
        let (on_new, on_diff, on_update) = (mirror.clone(), mirror.clone(), mirror.clone());
        let (new_count, diff_count, verify) = (counters.clone(), counters.clone(), counters.clone());
        BookListeners::new()
            .on_new_book(move |window| {
                new_count.new_books.fetch_add(1, Ordering::Relaxed);
                on_new.lock().reset(window.asks, window.bids);
            })
            .on_incremental_change(move |diff| {
                let changes = diff.changes;
                diff_count.diffs.fetch_add(1, Ordering::Relaxed);
                diff_count
                    .removals
                    .fetch_add(changes.removals.len() as u64, Ordering::Relaxed);
                diff_count
                    .additions
                    .fetch_add(changes.additions.len() as u64, Ordering::Relaxed);
                diff_count
                    .updates
                    .fetch_add(changes.updates.len() as u64, Ordering::Relaxed);
                on_diff.lock().apply(changes);
            })
            .on_book_update(move |window| {
                let expected = window_checksum(window.asks, window.bids);
                let actual = on_update.lock().checksum();
                verify.verified.fetch_add(1, Ordering::Relaxed);
                verify.last_checksum.store(u64::from(expected), Ordering::Relaxed);
                if expected != actual {
                    verify.mismatched.fetch_add(1, Ordering::Relaxed);
                }
            })
    };

    let handle = conn.create_book_with_listeners("DEMO", "", depth, listeners)?;
    let book = conn.book(handle)?;
    let key = SubscriptionKey::new(Symbol::new("DEMO")?, Source::composite());

    println!("{} Book created ({} levels per side)", "✓".green(), depth);
    println!("{} Replaying {} synthetic batches...\n", "✓".green(), batches);

    println!(
        "  {:>8}  {:>10}  {:>10}  {:>10}  {:>8}",
        "DIFFS".white().bold(),
        "CHECKSUM".white().bold(),
        "VERIFIED".white().bold(),
        "MID".white().bold(),
        "STATUS".white().bold()
    );
    println!("  {}", "─".repeat(54));

    let publisher = {
        let channel = channel.clone();
        tokio::spawn(async move {
            let mut flow = OrderFlow::new(42, 100.0, 0.25);
            channel.publish(&key, &flow.snapshot(400), true);

            let mut ticker = tokio::time::interval(Duration::from_micros(200));
            for n in 1..=batches {
                ticker.tick().await;
                // Re-snapshot occasionally, as a feed does after a gap
                if n % 1_000 == 0 {
                    let snapshot = flow.snapshot(400);
                    channel.publish(&key, &snapshot, true);
                } else {
                    let batch = flow.next_batch(8);
                    channel.publish(&key, &batch, false);
                }
            }
            flow.mid()
        })
    };

    let start = Instant::now();
    while !publisher.is_finished() {
        tokio::time::sleep(Duration::from_millis(100)).await;

        let mismatched = counters.mismatched.load(Ordering::Relaxed);
        let status = if mismatched == 0 {
            "IN SYNC".green()
        } else {
            "DIVERGED".red()
        };
        println!(
            "  {:>8}  {:>10}  {:>10}  {:>10}  {:>8}",
            counters.diffs.load(Ordering::Relaxed),
            format!("{:08X}", counters.last_checksum.load(Ordering::Relaxed)),
            counters.verified.load(Ordering::Relaxed),
            book.mid_price()
                .map(|m| format!("{:.2}", m))
                .unwrap_or_else(|| "-".into()),
            status
        );
    }
    let final_mid = publisher.await?;

    let book_checksum = book.checksum();
    let final_match = book_checksum == mirror.lock().checksum();
    let mirror_mismatches = mirror.lock().mismatches();
    if !final_match || mirror_mismatches > 0 {
        warn!(mirror_mismatches, "Mirror diverged from book");
    }

    println!();
    println!("{}", "═".repeat(65).cyan());
    println!("  {}", "MIRROR REPORT".white().bold());
    println!("{}", "═".repeat(65).cyan());
    println!();
    println!("  Elapsed:          {:.2?}", start.elapsed());
    println!("  New books:        {}", counters.new_books.load(Ordering::Relaxed));
    println!("  Diffs:            {}", counters.diffs.load(Ordering::Relaxed));
    println!("  Removals:         {}", counters.removals.load(Ordering::Relaxed));
    println!("  Additions:        {}", counters.additions.load(Ordering::Relaxed));
    println!("  Updates:          {}", counters.updates.load(Ordering::Relaxed));
    println!("  Live orders:      {}", book.order_count());
    println!("  Final mid:        {:.2}", final_mid);
    println!(
        "  Verified:         {} ({} mismatched)",
        counters.verified.load(Ordering::Relaxed),
        counters.mismatched.load(Ordering::Relaxed)
    );
    println!("  Final checksum:   {:08X}", book_checksum);
    println!(
        "  Final state:      {}",
        if final_match { "IN SYNC".green() } else { "DIVERGED".red() }
    );

    info!(handle = %handle, "Closing book");
    conn.close_book(handle);
    Ok(())
}
