use std::error::Error;
use std::time::{Duration, Instant};

use clap::Parser;
use grid_lob::{BookConfig, OrderBook, Side};
use hdrhistogram::Histogram;
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Measure per-operation latency of submit and cancel")]
struct Args {
    /// Number of measured operations
    #[arg(long, default_value_t = 1_000_000)]
    iterations: u64,

    /// Arena capacity
    #[arg(long, default_value_t = 100_000)]
    capacity: u32,

    /// Cancel every n-th submission that rests
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u64).range(1..))]
    cancel_every: u64,
}

fn report(name: &str, histogram: &Histogram<u64>, total: Duration) {
    let ops = histogram.len();
    println!("\n=== {name} latency (ns) ===");
    println!("Total Ops:  {}", ops);
    println!("Throughput: {:.2} ops/sec", ops as f64 / total.as_secs_f64());
    println!("---------------------------");
    println!("Min:    {:6} ns", histogram.min());
    println!("P50:    {:6} ns", histogram.value_at_quantile(0.50));
    println!("P90:    {:6} ns", histogram.value_at_quantile(0.90));
    println!("P99:    {:6} ns", histogram.value_at_quantile(0.99));
    println!("P99.9:  {:6} ns", histogram.value_at_quantile(0.999));
    println!("P99.99: {:6} ns", histogram.value_at_quantile(0.9999));
    println!("Max:    {:6} ns", histogram.max());
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    println!("Preparing Latency Benchmark...");

    let config = BookConfig::new(Decimal::new(1, 2), Decimal::from(200), args.capacity);
    let mut book = OrderBook::new(config)?;

    let mut submit_hist = Histogram::<u64>::new_with_bounds(1, 1_000_000, 3)?;
    let mut cancel_hist = Histogram::<u64>::new_with_bounds(1, 1_000_000, 3)?;
    let mut submit_total = Duration::ZERO;
    let mut cancel_total = Duration::ZERO;

    println!("Running {} iterations...", args.iterations);

    for i in 0..args.iterations {
        let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
        // Bids 99.00-99.99, asks 99.50-100.49: overlapping, so some cross
        let cents = match side {
            Side::Buy => 9_900 + (i % 100),
            Side::Sell => 9_950 + (i % 100),
        };
        let price = Decimal::new(cents as i64, 2);
        let volume = Decimal::from(1 + i % 10);

        let start = Instant::now();
        let result = std::hint::black_box(book.submit(1, price, volume, side));
        let elapsed = start.elapsed();
        submit_hist.record(elapsed.as_nanos() as u64).unwrap_or(());
        submit_total += elapsed;

        // Keep the arena from filling up
        if let Ok(order_id) = result {
            if i % args.cancel_every == 0 && book.contains_order(order_id) {
                let start = Instant::now();
                let _ = std::hint::black_box(book.cancel(order_id));
                let elapsed = start.elapsed();
                cancel_hist.record(elapsed.as_nanos() as u64).unwrap_or(());
                cancel_total += elapsed;
            }
        }
    }

    report("Submit", &submit_hist, submit_total);
    if !cancel_hist.is_empty() {
        report("Cancel", &cancel_hist, cancel_total);
    }
    println!("\nResting orders at end: {}", book.order_count());

    Ok(())
}
