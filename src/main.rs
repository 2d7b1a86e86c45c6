use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info};

use crack_spread::{download_prices, read_prices_csv, run_analysis, write_prices_csv, Config, YahooClient};

#[derive(Parser, Debug)]
#[command(name = "crack_spread")]
#[command(about = "3-2-1 crack spread: regime analysis, reports and a toy rule backtest", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// First date to download (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Directory for the processed panel
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory for plots and text reports
    #[arg(long)]
    reports_dir: Option<PathBuf>,

    /// Read prices from a saved CSV instead of downloading
    #[arg(long, value_name = "CSV")]
    prices_csv: Option<PathBuf>,

    /// Don't save the downloaded prices
    #[arg(long)]
    no_cache: bool,

    /// Write text reports only
    #[arg(long)]
    no_plots: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("crack_spread=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(start) = args.start {
        config.start = start;
    }
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    if let Some(dir) = args.reports_dir {
        config.reports_dir = dir;
    }
    if args.no_plots {
        config.output.plots = false;
    }
    config.validate()?;

    let prices = match &args.prices_csv {
        Some(path) => {
            info!("Loading prices from {}", path.display());
            read_prices_csv(path)?
        }
        None => {
            let client = YahooClient::new()?;
            let tickers = config.instruments.tickers();
            let prices = download_prices(&client, &tickers, config.start).await?;
            if !args.no_cache {
                let cache = config.prices_csv();
                write_prices_csv(&prices, &cache)?;
                info!("Cached prices to {}", cache.display());
            }
            prices
        }
    };
    debug!("Forward-filled prices can carry stale values across single-exchange holidays");

    let summary = run_analysis(&prices, &config)?;

    info!(
        "Done: {} artifacts written, {} skipped",
        summary.written.len(),
        summary.skipped.len()
    );
    for path in &summary.written {
        println!("{}", path.display());
    }
    Ok(())
}
