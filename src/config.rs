use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::{FeedConfig, Result};

/// Process-wide configuration: the fixed feed list plus pipeline tuning
/// knobs. Supplied at startup and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_feeds")]
    pub feeds: Vec<FeedConfig>,

    /// Automatic refresh period, in seconds.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Per-source fetch timeout inside a refresh cycle, in seconds.
    #[serde(default = "default_source_timeout_secs")]
    pub source_timeout_secs: u64,

    /// Size of the enrichment worker pool.
    #[serde(default = "default_enrich_concurrency")]
    pub enrich_concurrency: usize,

    /// Snapshot capacity; merges truncate to the most recent this many.
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    /// Language the enricher translates and summarizes into.
    #[serde(default = "default_target_language")]
    pub target_language: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            feeds: default_feeds(),
            refresh_interval_secs: default_refresh_interval_secs(),
            source_timeout_secs: default_source_timeout_secs(),
            enrich_concurrency: default_enrich_concurrency(),
            max_items: default_max_items(),
            target_language: default_target_language(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a JSON file; missing fields fall back to
    /// the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&raw)?;
        info!(
            "Loaded configuration from {} ({} feeds)",
            path.display(),
            config.feeds.len()
        );
        Ok(config)
    }
}

fn default_feeds() -> Vec<FeedConfig> {
    vec![
        FeedConfig {
            id: "techcrunch".to_string(),
            name: "TechCrunch AI".to_string(),
            url: "https://techcrunch.com/category/artificial-intelligence/feed/".to_string(),
            color: "#16a34a".to_string(),
        },
        FeedConfig {
            id: "openai".to_string(),
            name: "OpenAI Blog".to_string(),
            url: "https://openai.com/index.xml".to_string(),
            color: "#000000".to_string(),
        },
        FeedConfig {
            id: "deepmind".to_string(),
            name: "Google DeepMind".to_string(),
            url: "https://deepmind.google/rss/blog".to_string(),
            color: "#4285F4".to_string(),
        },
    ]
}

fn default_refresh_interval_secs() -> u64 {
    15 * 60
}

fn default_source_timeout_secs() -> u64 {
    45
}

fn default_enrich_concurrency() -> usize {
    3
}

fn default_max_items() -> usize {
    30
}

fn default_target_language() -> String {
    "Korean".to_string()
}
