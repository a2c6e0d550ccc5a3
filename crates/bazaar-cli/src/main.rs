use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use bazaar_client::{ExchangeRateClient, ReqwestFetcher};
use bazaar_core::cache::{CachedFetcher, CachedRateProvider};
use bazaar_core::models::{MAX_RESULTS_LIMIT, ProductRecord, SearchQuery, SearchReport};
use bazaar_core::strategy::strategies_from_json;
use bazaar_core::traits::{Fetcher, RateProvider};
use bazaar_core::{AppError, AuxLinkScanner, RateLookup, SearchConfig, SearchPipeline, SearchStatus};

const UNREACHABLE: &str = "could not reach the search page";

#[derive(Parser)]
#[command(name = "bazaar", version, about = "Search a product catalog by keyword")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the catalog for one keyword
    Search {
        /// Keyword to search for
        keyword: String,

        #[command(flatten)]
        options: SearchOptions,

        /// JSON file with selector strategies replacing the built-in ones
        #[arg(long)]
        strategies: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show the current conversion factors
    Rates,

    /// Read keywords from stdin, one per line, reusing cached pages and rates
    Shell {
        #[command(flatten)]
        options: SearchOptions,
    },
}

#[derive(Args)]
struct SearchOptions {
    /// Price ceiling in the base currency (0 means no ceiling)
    #[arg(short = 'p', long)]
    max_price: Option<f64>,

    /// Maximum number of records to return
    #[arg(
        short = 'n',
        long,
        env = "BAZAAR_MAX_RESULTS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u16).range(1..=MAX_RESULTS_LIMIT as i64)
    )]
    max_results: u16,

    /// Scan each product page for auxiliary links
    #[arg(long, default_value_t = false)]
    enrich: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("bazaar=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = SearchConfig::from_env().context("Invalid configuration")?;

    match cli.command {
        Commands::Search {
            keyword,
            options,
            strategies,
            json,
        } => {
            let pipeline = build_pipeline(
                ReqwestFetcher::from_config(&config).context("Failed to create HTTP client")?,
                ExchangeRateClient::from_config(&config)
                    .context("Failed to create rates client")?,
                &config,
                &options,
                strategies.as_deref(),
            )?;
            cmd_search(&pipeline, &keyword, &options, json).await?;
        }
        Commands::Rates => {
            let client = ExchangeRateClient::from_config(&config)
                .context("Failed to create rates client")?;
            cmd_rates(&client, &config).await;
        }
        Commands::Shell { options } => {
            let pipeline = build_pipeline(
                CachedFetcher::new(
                    ReqwestFetcher::from_config(&config)
                        .context("Failed to create HTTP client")?,
                    config.rates_ttl,
                ),
                CachedRateProvider::new(
                    ExchangeRateClient::from_config(&config)
                        .context("Failed to create rates client")?,
                    config.rates_ttl,
                ),
                &config,
                &options,
                None,
            )?;
            cmd_shell(&pipeline, &options).await?;
        }
    }

    Ok(())
}

fn build_pipeline<F: Fetcher, R: RateProvider>(
    fetcher: F,
    rates: R,
    config: &SearchConfig,
    options: &SearchOptions,
    strategies: Option<&Path>,
) -> Result<SearchPipeline<F, R>> {
    let mut pipeline = SearchPipeline::new(fetcher, rates, config.clone())?;

    if let Some(path) = strategies {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read strategies file: {}", path.display()))?;
        let strategies = strategies_from_json(&json)
            .with_context(|| format!("Invalid strategies in {}", path.display()))?;
        tracing::info!(count = strategies.len(), "Loaded custom selector strategies");
        pipeline = pipeline.with_strategies(strategies);
    }

    if options.enrich {
        pipeline = pipeline.with_enrichment(AuxLinkScanner::new(&config.aux_host_pattern)?);
    }

    Ok(pipeline)
}

fn build_query(keyword: &str, options: &SearchOptions) -> Result<SearchQuery, AppError> {
    SearchQuery::new(keyword, options.max_price, usize::from(options.max_results))
}

async fn cmd_search<F: Fetcher, R: RateProvider>(
    pipeline: &SearchPipeline<F, R>,
    keyword: &str,
    options: &SearchOptions,
    json: bool,
) -> Result<()> {
    let query = build_query(keyword, options)?;
    let report = pipeline.search(&query).await.map_err(|e| {
        if e.is_fetch_failure() {
            anyhow::Error::new(e).context(UNREACHABLE)
        } else {
            anyhow::Error::new(e)
        }
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, &query);
    }
    Ok(())
}

async fn cmd_rates<R: RateProvider>(provider: &R, config: &SearchConfig) {
    let currencies = &config.currencies;
    let lookup = provider
        .get_rates(&currencies.base, &currencies.symbols())
        .await;

    if let RateLookup::Unavailable { reason } = &lookup {
        println!("Live rates unavailable ({reason}); showing fallback factors.\n");
    }

    println!("1 {} =", currencies.base);
    for target in &currencies.targets {
        match lookup.rates().and_then(|r| r.factor(&target.code)) {
            Some(factor) => println!("  {:>10.4} {} (live)", factor, target.code),
            None => println!("  {:>10.4} {} (fallback)", target.fallback_factor, target.code),
        }
    }
}

async fn cmd_shell<F: Fetcher, R: RateProvider>(
    pipeline: &SearchPipeline<F, R>,
    options: &SearchOptions,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprintln!("Enter a keyword per line (Ctrl-D to quit).");

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let keyword = line.trim();
        if keyword.is_empty() {
            continue;
        }

        let query = match build_query(keyword, options) {
            Ok(query) => query,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };

        match pipeline.search(&query).await {
            Ok(report) => print_report(&report, &query),
            Err(e) if e.is_fetch_failure() => eprintln!("{UNREACHABLE}: {e}"),
            Err(e) => eprintln!("Search failed: {e}"),
        }
    }

    Ok(())
}

fn print_report(report: &SearchReport, query: &SearchQuery) {
    match report.status {
        SearchStatus::NoListings => {
            println!("No product listings found for '{}'.", report.keyword);
            return;
        }
        SearchStatus::NoneWithinBudget => {
            println!(
                "Found {} listings for '{}' but none at or under {:.2}.",
                report.stats.candidates - report.stats.incomplete,
                report.keyword,
                query.max_price().unwrap_or_default(),
            );
            return;
        }
        SearchStatus::Found => {}
    }

    println!("{}\n", results_heading(report));
    for (i, record) in report.records.iter().enumerate() {
        print_record(i + 1, record);
    }
    if !report.rates_live {
        println!("Converted prices use fallback factors; live rates were unavailable.");
    }
}

/// Headline for a successful search. Reports page cards rather than complete
/// listings: extraction stops once the cap is reached, so later cards are
/// never checked for completeness.
fn results_heading(report: &SearchReport) -> String {
    format!(
        "Results for '{}' ({} shown, {} product cards on the page):",
        report.keyword,
        report.records.len(),
        report.stats.candidates,
    )
}

fn print_record(position: usize, record: &ProductRecord) {
    println!("{position:>3}. {}", record.title);

    let price = if record.price_known {
        format!("{:.2} CNY", record.price_base)
    } else {
        "price unknown".to_string()
    };
    let converted: Vec<String> = record
        .price_converted
        .iter()
        .map(|(code, value)| format!("{value:.2} {code}"))
        .collect();
    if record.price_known && !converted.is_empty() {
        println!("     {price} (~ {})", converted.join(", "));
    } else {
        println!("     {price}");
    }

    println!("     {}", record.link);
    if let Some(image) = &record.image_url {
        println!("     image: {image}");
    }
    for link in &record.auxiliary_links {
        println!("     sheet: {link}");
    }
    println!();
}
