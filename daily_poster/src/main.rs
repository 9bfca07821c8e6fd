use anyhow::Context;
use clap::Parser;
use daily_poster::{
    config::{Config, DEFAULT_SENT_LOG_PATH, DEFAULT_TABLE_PATH},
    feishu::FeishuClient,
    pipeline::FeishuMessenger,
    Poster, RunOutcome,
};
use series_scraper::{ai::DescriptionGenerator, init_tracing};
use std::{path::PathBuf, time::Duration};
use tracing::info;

// Grounded generation on the pro model routinely takes over a minute.
const HTTP_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Parser, Debug)]
#[command(author, version, about = "Post one not-yet-sent car series to the group chat", long_about = None)]
struct Args {
    /// Enriched table written by series-scraper
    #[arg(short, long, default_value = DEFAULT_TABLE_PATH)]
    table: PathBuf,

    /// Append-only log of series ids already posted
    #[arg(short, long, default_value = DEFAULT_SENT_LOG_PATH)]
    sent_log: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    info!("starting daily post");

    let config = Config::from_env().context("poster is not configured")?;

    let http = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("failed to build HTTP client")?;
    let describer = DescriptionGenerator::new(config.gemini_api_key.clone())
        .with_client(http.clone())
        .with_base_url(config.gemini_base_url.as_str())
        .with_model(config.gemini_model.as_str());
    let messenger = FeishuMessenger::new(FeishuClient::new(http, &config.feishu_base_url), &config);
    let poster = Poster::new(&describer, &messenger, &config.series_base_url);

    let outcome = poster
        .run(&args.table, &args.sent_log, &mut rand::rng())
        .await
        .context("daily post aborted")?;

    match outcome {
        RunOutcome::Exhausted => info!("nothing left to post, delete the sent log to start over"),
        RunOutcome::Posted { id } => info!(%id, "daily post finished"),
    }
    Ok(())
}
