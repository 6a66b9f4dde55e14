//! StockScope CLI — symbol search, company data, and price charts.
//!
//! Commands:
//! - `search` — look up symbols matching a free-text query
//! - `profile` — print a company profile
//! - `quote` — print the latest quote
//! - `chart` — fetch one chart series and print it as a table, JSON or CSV
//! - `filters` — list the time-range presets
//! - `watch` — interactive chart session driven by stdin

mod watch;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use stockscope_core::{
    ChartConfig, ChartPipeline, ChartPoint, Config, FilterSpec, FinnhubClient, HistoryMode,
    MarketDataClient, DEFAULT_FILTER, FILTERS, INITIAL_FILTER,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "stockscope",
    about = "StockScope CLI — market data lookups and historical price charts"
)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Fetch historical candles from the provider instead of the bundled series.
    #[arg(long, global = true, default_value_t = false)]
    live: bool,

    /// Log at debug level (overrides RUST_LOG).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for symbols matching a query.
    Search {
        /// Free-text query (e.g., apple, "berkshire hathaway").
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Print the company profile for a symbol.
    Profile { symbol: String },
    /// Print the latest quote for a symbol.
    Quote { symbol: String },
    /// Fetch a historical chart series.
    Chart {
        symbol: String,

        /// Time-range filter: 1D, 1W, 1M, 3M, 1Y.
        #[arg(long, default_value = INITIAL_FILTER)]
        filter: String,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// List the time-range filters.
    Filters,
    /// Interactive chart session. Reads `<filter>`, `symbol <SYM>`, `clear`,
    /// `refresh` and `quit` from stdin.
    Watch {
        /// Symbol to start with.
        symbol: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    if cli.live {
        config.api.history_mode = HistoryMode::Live;
    }
    info!(
        history_mode = %config.api.history_mode,
        base_url = %config.api.base_url,
        "configuration loaded"
    );

    match cli.command {
        Commands::Filters => {
            run_filters();
            Ok(())
        }
        Commands::Search { query } => run_search(&build_client(&config)?, &query.join(" ")),
        Commands::Profile { symbol } => run_profile(&build_client(&config)?, &normalize(&symbol)?),
        Commands::Quote { symbol } => run_quote(&build_client(&config)?, &normalize(&symbol)?),
        Commands::Chart {
            symbol,
            filter,
            format,
        } => run_chart(
            build_client(&config)?,
            &config.chart,
            &normalize(&symbol)?,
            &filter,
            format,
        ),
        Commands::Watch { symbol } => watch::run(build_client(&config)?, &config.chart, symbol),
    }
}

/// Logs go to stderr so stdout stays clean for `--format json|csv`.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("stockscope=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stockscope=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn build_client(config: &Config) -> Result<Arc<dyn MarketDataClient>> {
    let client = FinnhubClient::new(config.api.clone())?;
    Ok(Arc::new(client))
}

fn normalize(symbol: &str) -> Result<String> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        bail!("symbol must not be empty");
    }
    Ok(symbol.to_ascii_uppercase())
}

fn run_filters() {
    println!("{:<6} {:<10} {:<12} Notes", "Name", "Offset", "Resolution");
    println!("{}", "-".repeat(44));
    for spec in &FILTERS {
        let mut notes = Vec::new();
        if spec.name == INITIAL_FILTER {
            notes.push("initial");
        }
        if spec.name == DEFAULT_FILTER {
            notes.push("fallback");
        }
        println!(
            "{:<6} {:<10} {:<12} {}",
            spec.name,
            spec.describe_offset(),
            spec.resolution.as_str(),
            notes.join(", ")
        );
    }
}

fn run_search(client: &Arc<dyn MarketDataClient>, query: &str) -> Result<()> {
    let results = client.search_symbols(query)?;
    if results.result.is_empty() {
        println!("No matches for '{query}'.");
        return Ok(());
    }

    println!("{} match(es) for '{query}':", results.count);
    println!();
    println!("{:<12} {:<40} {}", "Symbol", "Description", "Type");
    println!("{}", "-".repeat(66));
    for m in &results.result {
        println!("{:<12} {:<40} {}", m.display_symbol, m.description, m.kind);
    }
    Ok(())
}

fn run_profile(client: &Arc<dyn MarketDataClient>, symbol: &str) -> Result<()> {
    let profile = client.fetch_profile(symbol)?;
    if profile.is_empty() {
        bail!("no profile found for '{symbol}'");
    }

    let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    println!();
    println!("=== {} ===", field(&profile.name));
    println!("Ticker:         {}", field(&profile.ticker));
    println!("Exchange:       {}", field(&profile.exchange));
    println!("Industry:       {}", field(&profile.finnhub_industry));
    println!("Country:        {}", field(&profile.country));
    println!("IPO:            {}", field(&profile.ipo));
    match profile.market_cap_billions() {
        Some(cap) => println!(
            "Market Cap:     {cap:.2}B {}",
            profile.currency.as_deref().unwrap_or_default()
        ),
        None => println!("Market Cap:     -"),
    }
    if let Some(shares) = profile.share_outstanding {
        println!("Shares Out:     {shares:.2}M");
    }
    println!("Web:            {}", field(&profile.weburl));
    println!();
    Ok(())
}

fn run_quote(client: &Arc<dyn MarketDataClient>, symbol: &str) -> Result<()> {
    let quote = client.fetch_quote(symbol)?;
    if quote.current == 0.0 && quote.timestamp == 0 {
        bail!("no quote available for '{symbol}'");
    }

    let change = match (quote.change, quote.percent_change) {
        (Some(d), Some(dp)) => format!("{d:+.2} ({dp:+.2}%)"),
        (Some(d), None) => format!("{d:+.2}"),
        _ => "-".to_string(),
    };
    println!("{symbol}  {:.2}  {change}", quote.current);
    println!(
        "Open {:.2}  High {:.2}  Low {:.2}  Prev Close {:.2}",
        quote.open, quote.high, quote.low, quote.previous_close
    );
    Ok(())
}

fn run_chart(
    client: Arc<dyn MarketDataClient>,
    config: &ChartConfig,
    symbol: &str,
    filter: &str,
    format: OutputFormat,
) -> Result<()> {
    let filter = filter.to_ascii_uppercase();
    if FilterSpec::find(&filter).is_none() {
        let names: Vec<&str> = FilterSpec::names().collect();
        bail!("unknown filter '{filter}'. Valid: {}", names.join(", "));
    }

    let mut pipeline = ChartPipeline::new(client, config);
    pipeline.set_inputs(Some(symbol), &filter);
    let settled = pipeline.wait_next(Some(Duration::from_secs(120)));
    if !settled {
        bail!("timed out waiting for the {filter} chart of {symbol}");
    }

    let view = pipeline.view();
    if let Some(error) = view.error {
        bail!("chart for {symbol} ({filter}) failed: {error}");
    }

    let mut out = std::io::stdout().lock();
    match format {
        OutputFormat::Table => print_table(&mut out, symbol, &filter, &view.data)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &view.data)?;
            writeln!(out)?;
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(&mut out);
            for point in &view.data {
                writer.serialize(point)?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}

fn print_table(out: &mut impl Write, symbol: &str, filter: &str, data: &[ChartPoint]) -> Result<()> {
    writeln!(out, "{symbol} ({filter}): {} points", data.len())?;
    writeln!(out)?;
    writeln!(out, "{:<20} {:>12}", "Date", "Close")?;
    writeln!(out, "{}", "-".repeat(33))?;
    for point in data {
        writeln!(out, "{:<20} {:>12}", point.date, point.value)?;
    }
    Ok(())
}
