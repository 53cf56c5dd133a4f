use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use newsdash::{
    AppConfig, Enricher, FeedSource, FetchConfig, Fetcher, GeminiEnricher, LogNotifier,
    MockEnricher, NewsPipeline, RefreshScheduler, RssFeedSource,
};

#[derive(Parser, Debug)]
#[command(name = "newsdash", about = "AI news dashboard pipeline")]
struct Args {
    /// Path to a JSON configuration file (feeds and tuning knobs)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the automatic refresh period, in seconds
    #[arg(long)]
    interval: Option<u64>,

    /// Override the enrichment worker pool size
    #[arg(long)]
    concurrency: Option<usize>,

    /// Run with the mock enricher instead of the Gemini API
    #[arg(long)]
    mock: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(secs) = args.interval {
        config.refresh_interval_secs = secs;
    }
    if let Some(workers) = args.concurrency {
        config.enrich_concurrency = workers;
    }

    info!(
        "Starting news dashboard pipeline: {} feeds, refresh every {}s",
        config.feeds.len(),
        config.refresh_interval_secs
    );

    let enricher: Arc<dyn Enricher> = if args.mock {
        info!("Using the mock enricher");
        Arc::new(MockEnricher::new().with_delay(100))
    } else {
        let api_key = env::var("GEMINI_API_KEY").map_err(|_| {
            anyhow::anyhow!("GEMINI_API_KEY is not set (pass --mock to run without it)")
        })?;
        Arc::new(GeminiEnricher::new(api_key, config.target_language.clone())?)
    };

    let fetcher = Arc::new(Fetcher::new(FetchConfig::default())?);
    let sources: Vec<Arc<dyn FeedSource>> = config
        .feeds
        .iter()
        .map(|feed| {
            Arc::new(RssFeedSource::new(feed.clone(), fetcher.clone())) as Arc<dyn FeedSource>
        })
        .collect();

    let pipeline = Arc::new(NewsPipeline::new(
        sources,
        enricher,
        Arc::new(LogNotifier),
        &config,
    ));

    let scheduler = RefreshScheduler::new(
        pipeline.clone(),
        Duration::from_secs(config.refresh_interval_secs),
    );
    scheduler.start().await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    scheduler.stop().await;

    Ok(())
}
