//! pbval CLI binary.
//!
//! Provides command-line interface for PB valuation of A-shares and ETFs.

mod integration;

use chrono::{Datelike, Local};
use clap::{Parser, Subcommand, ValueEnum};
use integration::cache_manager;
use integration::input::resolve_codes;
use integration::progress::{instrument_bar, record};
use pbval::etf::{EtfValuation, HoldingsSource, refresh_holdings, value_etf_with};
use pbval::{BatchReport, BatchRunner, PbConfig, profile_etf};
use pbval_data::{MarketDataProvider, SqliteCache, StaticProvider, WebProvider, code};
use pbval_engine::{Composite, PbService};
use pbval_output::ValuationSummary;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pbval")]
#[command(about = "Point-in-time price-to-book valuation for A-shares and ETFs", long_about = None)]
#[command(version)]
struct Cli {
    /// SQLite cache file
    #[arg(long, global = true, env = "PBVAL_DB")]
    db: Option<PathBuf>,

    /// Seconds to wait after each instrument that hit the network
    #[arg(long, global = true, env = "PBVAL_FETCH_DELAY_SECS", default_value_t = 5)]
    fetch_delay_secs: u64,

    /// Directory of hold_<etf>.csv files
    #[arg(long, global = true, env = "PBVAL_HOLDINGS_DIR", default_value = "etf-codes")]
    holdings_dir: PathBuf,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the daily PB series of one stock
    Stock {
        /// Six-digit stock code
        code: String,
    },

    /// Compute PB series for many stocks
    Batch {
        /// Comma-separated stock codes
        #[arg(long, value_delimiter = ',')]
        codes: Vec<String>,

        /// CSV whose second column lists stock codes
        #[arg(long)]
        holdings_file: Option<PathBuf>,
    },

    /// Value an ETF from its constituents
    Etf {
        /// Six-digit ETF code
        code: String,

        /// Use cached data and holdings files only
        #[arg(long)]
        cache_only: bool,

        /// First year of holdings to fetch when no file exists
        #[arg(long, default_value_t = pbval::config::DEFAULT_HOLDINGS_START_YEAR)]
        start_year: i32,

        /// Last year of holdings to fetch (defaults to the current year)
        #[arg(long)]
        end_year: Option<i32>,
    },

    /// Fetch and save an ETF's holdings disclosures
    Holdings {
        /// Six-digit ETF code
        etf: String,

        /// First year to fetch
        #[arg(long, default_value_t = pbval::config::DEFAULT_HOLDINGS_START_YEAR)]
        start_year: i32,

        /// Last year to fetch (defaults to the current year)
        #[arg(long)]
        end_year: Option<i32>,
    },

    /// Amplitude and turnover profile of an ETF
    Profile {
        /// Six-digit ETF code
        etf: String,

        /// Use cached prices only
        #[arg(long)]
        cache_only: bool,
    },

    /// Show cache statistics
    Stats,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let today = Local::now().date_naive();

    let config = PbConfig::new(cache_manager::resolve_cache_path(cli.db), today)
        .with_holdings_dir(cli.holdings_dir)
        .with_fetch_delay(Duration::from_secs(cli.fetch_delay_secs));
    let cache = cache_manager::open_cache(&config.db_path)?;
    debug!(cache = %cache.location(), "Opened cache");
    let format = cli.format;

    match cli.command {
        Commands::Stock { code } => {
            let provider = WebProvider::new()?;
            stock(&cache, &provider, &config, &code, format).await?;
        }
        Commands::Batch {
            codes,
            holdings_file,
        } => {
            let codes = resolve_codes(codes, holdings_file.as_deref())?;
            let provider = WebProvider::new()?;
            batch(&cache, &provider, &config, &codes, format).await?;
        }
        Commands::Etf {
            code,
            cache_only,
            start_year,
            end_year,
        } => {
            let years = start_year..=end_year.unwrap_or_else(|| today.year());
            if cache_only {
                etf(&cache, &StaticProvider::new(), &config, &code, years, format).await?;
            } else {
                let provider = WebProvider::new()?;
                etf(&cache, &provider, &config, &code, years, format).await?;
            }
        }
        Commands::Holdings {
            etf,
            start_year,
            end_year,
        } => {
            let years = start_year..=end_year.unwrap_or_else(|| today.year());
            let provider = WebProvider::new()?;
            holdings(&provider, &config, &etf, years, format).await?;
        }
        Commands::Profile { etf, cache_only } => {
            if cache_only {
                profile(&cache, &StaticProvider::new(), &config, &etf, format).await?;
            } else {
                let provider = WebProvider::new()?;
                profile(&cache, &provider, &config, &etf, format).await?;
            }
        }
        Commands::Stats => {
            stats(&cache, format)?;
        }
    }

    Ok(())
}

fn banner(title: &str) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║{:^62}║", title);
    println!("╚══════════════════════════════════════════════════════════════╝\n");
}

async fn stock<P: MarketDataProvider>(
    cache: &SqliteCache,
    provider: &P,
    config: &PbConfig,
    stock_code: &str,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let stock_code = code::validate(stock_code)?;
    let service = PbService::new(cache, provider, config.batch.window);
    let series = service.compute_pb_series(stock_code).await?;
    let summary = ValuationSummary::from_pb_records(stock_code, &series.records);

    if format == OutputFormat::Json {
        let output = json!({
            "code": series.code,
            "source": series.source,
            "latest": series.latest(),
            "summary": summary,
            "records": series.records,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    banner(&format!("PB VALUATION: {}", code::with_suffix(stock_code)));
    println!("Cache: {}", cache.location());
    println!("Source: {:?}", series.source);
    println!("Records: {}", series.records.len());

    match series.latest() {
        Some(latest) => {
            println!("\nLatest ({}):", latest.date);
            println!("  Close:        {:.2}", latest.close_price);
            println!("  Total Shares: {:.0}", latest.total_shares);
            if let Some(report) = latest.report_period {
                println!("  Report:       {}", report);
            }
            if let Some(pb) = latest.pb {
                println!("  PB:           {:.4}", pb);
            }
        }
        None => println!("\nNo day has a defined PB yet."),
    }

    if let Some(summary) = summary {
        print!("{}", summary.to_ascii_table());
    }
    Ok(())
}

async fn batch<P: MarketDataProvider>(
    cache: &SqliteCache,
    provider: &P,
    config: &PbConfig,
    codes: &[String],
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    if format == OutputFormat::Text {
        banner(&format!("BATCH PB: {} INSTRUMENTS", codes.len()));
        println!("Cache: {}", cache.location());
        println!("Fetch delay: {}s\n", config.batch.fetch_delay.as_secs());
    }

    let pb = instrument_bar(codes.len() as u64, "Computing PB series...");
    let runner = BatchRunner::new(cache, provider, config.batch.clone());
    let report = runner
        .run_with(codes, |code, outcome| record(&pb, code, outcome))
        .await?;
    pb.finish_with_message(format!(
        "{} succeeded, {} failed",
        report.succeeded.len(),
        report.failed.len()
    ));

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_batch_report(&report);
    }
    Ok(())
}

fn print_batch_report(report: &BatchReport) {
    println!("\nBatch Summary:");
    println!("{}", "-".repeat(80));
    println!("  Succeeded:    {}", report.succeeded.len());
    println!("  From cache:   {}", report.cached);
    println!("  Failed:       {}", report.failed.len());
    for failure in &report.failed {
        println!("    {:<10} {}", failure.code, failure.reason);
    }
    println!("\nCache Statistics:");
    println!("{}", "-".repeat(80));
    print!("{}", report.stats);
}

async fn etf<P: MarketDataProvider>(
    cache: &SqliteCache,
    provider: &P,
    config: &PbConfig,
    etf_code: &str,
    years: std::ops::RangeInclusive<i32>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    if format == OutputFormat::Text {
        banner(&format!("ETF PB VALUATION: {}", etf_code));
    }

    let pb = instrument_bar(0, "Valuing constituents...");
    let valuation = value_etf_with(cache, provider, config, etf_code, years, |total, code, outcome| {
        pb.set_length(total as u64);
        record(&pb, code, outcome);
    })
    .await;
    pb.finish_and_clear();
    let valuation = valuation?;

    if format == OutputFormat::Json {
        let output = json!({
            "etf": valuation.etf_code,
            "holdings_rows": valuation.holdings.len(),
            "constituents": valuation.batch.total(),
            "succeeded": valuation.batch.succeeded,
            "failed": valuation.batch.failed,
            "aggregation": valuation.aggregation,
            "summary": valuation.summary,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_etf_valuation(&valuation);
    Ok(())
}

fn print_etf_valuation(valuation: &EtfValuation) {
    match &valuation.holdings_source {
        HoldingsSource::File(path) => println!("Holdings: {}", path.display()),
        HoldingsSource::Provider(path) => {
            println!("Holdings: fetched, saved to {}", path.display())
        }
    }
    println!(
        "Constituents: {} ({} valued, {} from cache, {} failed)",
        valuation.batch.total(),
        valuation.batch.succeeded.len(),
        valuation.batch.cached,
        valuation.batch.failed.len()
    );
    println!(
        "Strategy: {}{}",
        valuation.aggregation.strategy,
        if valuation.aggregation.fell_back {
            " (fallback)"
        } else {
            ""
        }
    );

    match &valuation.aggregation.composite {
        Composite::Series { points } => {
            if let Some(last) = points.last() {
                println!(
                    "\nComposite PB on {}: {:.4} ({} constituents, weight {:.2}%, holdings {})",
                    last.date,
                    last.pb,
                    last.contributing,
                    last.total_weight * 100.0,
                    last.quarter
                );
            }
        }
        Composite::Snapshot(snapshot) => {
            println!(
                "\nComposite PB as of {}: {:.4} ({} constituents, weight {:.2}%, holdings {})",
                snapshot.as_of,
                snapshot.pb,
                snapshot.contributing,
                snapshot.total_weight * 100.0,
                snapshot.quarter
            );
        }
    }

    if let Some(summary) = &valuation.summary {
        print!("{}", summary.to_ascii_table());
    }
}

async fn holdings<P: MarketDataProvider>(
    provider: &P,
    config: &PbConfig,
    etf_code: &str,
    years: std::ops::RangeInclusive<i32>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let (entries, path) = refresh_holdings(provider, config, etf_code, years).await?;

    let mut per_quarter: BTreeMap<String, (usize, f64)> = BTreeMap::new();
    for entry in &entries {
        let slot = per_quarter.entry(entry.quarter.to_string()).or_default();
        slot.0 += 1;
        slot.1 += entry.weight;
    }

    if format == OutputFormat::Json {
        let quarters: Vec<_> = per_quarter
            .iter()
            .map(|(q, (rows, weight))| json!({ "quarter": q, "rows": rows, "weight": weight }))
            .collect();
        let output = json!({
            "etf": etf_code,
            "rows": entries.len(),
            "path": path.as_ref().map(|p| p.display().to_string()),
            "quarters": quarters,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    banner(&format!("ETF HOLDINGS: {}", etf_code));
    match path {
        Some(path) => println!("Saved {} rows to {}", entries.len(), path.display()),
        None => println!("No holdings disclosed for the requested years."),
    }
    if !per_quarter.is_empty() {
        println!("\n{:<10} {:>8} {:>12}", "Quarter", "Rows", "Weight");
        println!("{}", "-".repeat(32));
        for (quarter, (rows, weight)) in &per_quarter {
            println!("{:<10} {:>8} {:>11.2}%", quarter, rows, weight * 100.0);
        }
    }
    Ok(())
}

async fn profile<P: MarketDataProvider>(
    cache: &SqliteCache,
    provider: &P,
    config: &PbConfig,
    etf_code: &str,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let profile = profile_etf(cache, provider, &config.batch.window, etf_code).await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&profile)?),
        OutputFormat::Text => print!("{}", profile.to_ascii_table()),
    }
    Ok(())
}

fn stats(cache: &SqliteCache, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let stats = cache.get_stats()?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Text => {
            println!("Cache: {}", cache.location());
            print!("{}", stats);
        }
    }
    Ok(())
}
