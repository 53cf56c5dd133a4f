use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::fetcher::Fetcher;
use crate::parser;
use crate::traits::FeedSource;
use crate::types::{FeedConfig, RawEntry, Result};

/// Generic RSS/Atom feed source backed by the shared HTTP fetcher.
pub struct RssFeedSource {
    config: FeedConfig,
    fetcher: Arc<Fetcher>,
}

impl RssFeedSource {
    pub fn new(config: FeedConfig, fetcher: Arc<Fetcher>) -> Self {
        Self { config, fetcher }
    }
}

#[async_trait]
impl FeedSource for RssFeedSource {
    fn config(&self) -> &FeedConfig {
        &self.config
    }

    async fn fetch(&self) -> Result<Vec<RawEntry>> {
        debug!("Pulling feed {} ({})", self.config.name, self.config.url);

        let body = self.fetcher.fetch(&self.config.url).await?;
        let entries = parser::parse_entries(&body)?;

        info!(
            "Source {} returned {} entries",
            self.config.id,
            entries.len()
        );
        Ok(entries)
    }
}
