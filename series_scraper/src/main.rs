use anyhow::Context;
use clap::Parser;
use dotenv::dotenv;
use series_scraper::{
    init_tracing,
    scraper::{Scraper, DEFAULT_BASE_URL, DEFAULT_CONCURRENCY},
    table, EnrichedTable,
};
use std::{path::PathBuf, time::Duration, time::Instant};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Resolve the main image of every car series", long_about = None)]
struct Args {
    /// Source table; first column is the series id
    #[arg(short, long, default_value = "车系.csv")]
    input: PathBuf,

    /// Enriched table to (re)write
    #[arg(short, long, default_value = "车系_url.csv")]
    output: PathBuf,

    /// Number of concurrent requests
    #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrent: usize,

    /// Per-request timeout in seconds
    #[arg(short, long, default_value_t = 15)]
    timeout_secs: u64,

    /// Detail page base; the series id is appended to it
    #[arg(short, long, default_value = DEFAULT_BASE_URL)]
    base_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing();

    let args = Args::parse();
    let started = Instant::now();

    let source = table::read_series_table(&args.input)
        .with_context(|| format!("failed to load {}", args.input.display()))?;
    if source.records.is_empty() {
        warn!(path = %args.input.display(), "source table has no series rows, nothing to do");
        return Ok(());
    }
    info!(
        path = %args.input.display(),
        series = source.records.len(),
        concurrent = args.concurrent,
        "loaded source table"
    );

    let scraper = Scraper::new(
        &args.base_url,
        args.concurrent,
        Duration::from_secs(args.timeout_secs),
    )
    .context("failed to build scraper")?;
    let report = scraper.scrape(source.records).await;

    let total = report.total();
    let dropped = report.dropped;
    let enriched = EnrichedTable {
        header: source.header,
        records: report.enriched,
    };
    table::write_enriched_table(&args.output, &enriched)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    let output = std::fs::canonicalize(&args.output).unwrap_or(args.output);
    info!(
        total,
        succeeded = enriched.records.len(),
        dropped,
        elapsed_secs = %format!("{:.2}", started.elapsed().as_secs_f64()),
        output = %output.display(),
        "scrape finished"
    );

    Ok(())
}
