use clap::{Parser, Subcommand};
use exchange::config::RuntimeConfig;
use exchange::report::{self, TradeTail};
use exchange::store::{OrderStore, SqliteStore};
use exchange::{metrics, MatchingEngine, NewOrder, OrderSide};
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::oneshot;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Runtime config file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Run the matcher and place orders read from stdin
    Engine,
    /// Best bid/ask per stock
    Monitor,
    /// Follow settled trades
    Transactions,
    /// Dump the order and trade tables
    Db {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Latest trade price per stock
    Prices,
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn read_orders(engine: &MatchingEngine) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Enter: <buy|sell> <stock_id> <units> <price> <user_id>");
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let order = match line.parse::<NewOrder>() {
            Ok(order) => order,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };
        match engine.place_order(order).await {
            Ok(placed) => {
                let colour = match placed.side {
                    OrderSide::Buy => "\x1b[32m",
                    OrderSide::Sell => "\x1b[31m",
                };
                println!("{}{} order #{}\x1b[0m", colour, placed.side, placed.order_id);
            }
            Err(e) => eprintln!("{}", e),
        }
    }
    Ok(())
}

async fn run_engine(config: &RuntimeConfig, store: Arc<dyn OrderStore>) -> anyhow::Result<()> {
    metrics::init_registry();
    if let Some(addr) = &config.metrics_addr {
        let addr: SocketAddr = addr.parse()?;
        tokio::spawn(async move {
            if let Err(e) = metrics::serve(addr).await {
                log::error!("metrics server failed: {}", e);
            }
        });
    }

    let engine = Arc::new(MatchingEngine::with_interval(store, config.match_interval()));
    engine.recover().await?;

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let matcher = tokio::spawn({
        let engine = engine.clone();
        async move {
            engine
                .run_matcher_until(async {
                    let _ = stop_rx.await;
                })
                .await
        }
    });

    tokio::select! {
        _ = shutdown_signal() => {},
        res = read_orders(&engine) => {
            res?;
            log::info!("input closed, matching until shutdown");
            shutdown_signal().await;
        }
    }
    let _ = stop_tx.send(());
    matcher.await?;
    Ok(())
}

/// Runs `view` until it fails or the process is asked to stop.
async fn until_shutdown<F>(view: F) -> anyhow::Result<()>
where
    F: Future<Output = anyhow::Result<()>>,
{
    tokio::select! {
        _ = shutdown_signal() => Ok(()),
        res = view => res,
    }
}

async fn monitor(store: Arc<dyn OrderStore>, refresh: Duration) -> anyhow::Result<()> {
    loop {
        let orders = store.list_orders().await?;
        println!("\n=== MONITOR (best bid/ask) ===");
        for quote in report::market_overview(&orders) {
            println!("{}", quote);
        }
        tokio::time::sleep(refresh).await;
    }
}

async fn transactions(store: Arc<dyn OrderStore>, refresh: Duration) -> anyhow::Result<()> {
    let mut tail = TradeTail::new();
    loop {
        for trade in tail.poll(store.as_ref()).await? {
            println!("{}", trade);
        }
        tokio::time::sleep(refresh).await;
    }
}

async fn dump(store: Arc<dyn OrderStore>, refresh: Duration, json: bool) -> anyhow::Result<()> {
    loop {
        let orders = store.list_orders().await?;
        let trades = store.list_trades(0).await?;
        if json {
            let tables = serde_json::json!({ "orders": orders, "trades": trades });
            println!("{}", serde_json::to_string_pretty(&tables)?);
        } else {
            println!("\n--- order_records ---");
            for order in &orders {
                println!("{}", report::format_order(order));
            }
            println!("\n--- transactions ---");
            for trade in &trades {
                println!("{}", report::format_trade(trade));
            }
        }
        tokio::time::sleep(refresh).await;
    }
}

async fn prices(store: Arc<dyn OrderStore>, refresh: Duration) -> anyhow::Result<()> {
    loop {
        println!("\n*** Stock Prices (Latest) ***");
        for (stock_id, price) in store.latest_prices().await? {
            println!("Stock {} → {}", stock_id, price);
        }
        tokio::time::sleep(refresh).await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::try_init().unwrap_or_default();
    let args = Args::parse();
    let config = RuntimeConfig::from_toml(&args.config);
    let store: Arc<dyn OrderStore> =
        Arc::new(SqliteStore::connect(&config.database_url, config.max_connections).await?);

    let refresh = config.refresh_interval();
    match args.mode {
        Mode::Engine => run_engine(&config, store).await?,
        Mode::Monitor => until_shutdown(monitor(store, refresh)).await?,
        Mode::Transactions => until_shutdown(transactions(store, refresh)).await?,
        Mode::Db { json } => until_shutdown(dump(store, refresh, json)).await?,
        Mode::Prices => until_shutdown(prices(store, refresh)).await?,
    }
    log::info!("exchange stop");
    Ok(())
}
