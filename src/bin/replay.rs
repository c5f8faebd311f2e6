//! Replay a CSV order stream through a book and print the fills.
//!
//! Input columns: `action,owner_id,side,price,volume,order_id`
//! where `action` is `submit` or `cancel`. Submits leave `order_id` empty;
//! cancels only need `order_id`.

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use grid_lob::{
    BookConfig, BookError, CancelOrder, Command, Engine, Outcome, Side, SubmitOrder, TradeEvent,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Replay an order stream through the matching engine")]
struct Args {
    /// CSV file to replay
    input: PathBuf,

    /// Price grid spacing
    #[arg(long, default_value = "0.01")]
    tick: Decimal,

    /// Exclusive upper bound on prices
    #[arg(long, default_value = "1000")]
    max_price: Decimal,

    /// Maximum number of resting orders
    #[arg(long, default_value_t = grid_lob::DEFAULT_CAPACITY)]
    capacity: u32,

    /// Print the final depth of the book
    #[arg(long)]
    depth: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Action {
    Submit,
    Cancel,
}

#[derive(Debug, Deserialize)]
struct Row {
    action: Action,
    owner_id: Option<u64>,
    side: Option<Side>,
    price: Option<Decimal>,
    volume: Option<Decimal>,
    order_id: Option<u64>,
}

impl Row {
    fn to_command(&self) -> Option<Command> {
        match self.action {
            Action::Submit => Some(Command::Submit(SubmitOrder {
                owner_id: self.owner_id?,
                side: self.side?,
                price: self.price?,
                volume: self.volume?,
            })),
            Action::Cancel => Some(Command::Cancel(CancelOrder {
                order_id: self.order_id?,
            })),
        }
    }
}

fn print_trade(t: &TradeEvent) {
    println!(
        "trade: {:?} party={} counterparty={} volume={} price={}",
        t.side, t.aggressor_owner_id, t.passive_owner_id, t.volume, t.price
    );
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = BookConfig::new(args.tick, args.max_price, args.capacity);
    let mut engine = Engine::new(config)?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(&args.input)?;

    let mut trades = 0usize;
    let mut rejected = 0usize;
    for (line, row) in reader.deserialize::<Row>().enumerate() {
        let row = row?;
        let Some(cmd) = row.to_command() else {
            tracing::warn!(line = line + 2, ?row, "incomplete row skipped");
            continue;
        };

        match engine.process_command(cmd) {
            Ok(Outcome::Submitted { order_id, trades: fills }) => {
                fills.iter().for_each(print_trade);
                trades += fills.len();
                println!("accepted: order {order_id}");
            }
            Ok(Outcome::Canceled(order)) => {
                println!("cancelled: order {} ({} open)", order.order_id, order.remaining_volume);
            }
            Err(err) => {
                // Fills before a full-book rejection still happened
                if let BookError::OrderBookFull { .. } = err {
                    engine.book().trades().iter().for_each(print_trade);
                    trades += engine.book().trades().len();
                }
                rejected += 1;
                println!("rejected: {err}");
            }
        }
    }

    println!(
        "\n{} trades, {} rejections, {} resting orders, state hash {:#018x}",
        trades,
        rejected,
        engine.order_count(),
        engine.state_hash()
    );
    if args.depth {
        print!("\n{}", engine.book().snapshot());
    }

    Ok(())
}
