use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::dispatcher::EnrichmentDispatcher;
use crate::merge::merge;
use crate::state::SnapshotStore;
use crate::traits::{Enricher, FeedSource, NotificationPermission, Notifier};
use crate::types::{DashboardError, NewsItem};

/// What a refresh trigger amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A merge was published; `has_new` mirrors the merge result.
    Merged { has_new: bool },
    /// A previous refresh had not settled yet; this trigger was rejected.
    AlreadyRunning,
    /// Every configured source failed; the previous snapshot was kept.
    AllSourcesFailed,
}

/// Coordinates the refresh cycle: fan out to the feed sources, merge into
/// the shared snapshot, announce new items, kick the dispatcher.
pub struct NewsPipeline {
    sources: Vec<Arc<dyn FeedSource>>,
    store: Arc<SnapshotStore>,
    dispatcher: Arc<EnrichmentDispatcher>,
    notifier: Arc<dyn Notifier>,
    refresh_gate: Mutex<()>,
    refresh_interval_secs: u64,
    source_timeout: Duration,
    max_items: usize,
}

impl NewsPipeline {
    pub fn new(
        sources: Vec<Arc<dyn FeedSource>>,
        enricher: Arc<dyn Enricher>,
        notifier: Arc<dyn Notifier>,
        config: &AppConfig,
    ) -> Self {
        let store = Arc::new(SnapshotStore::new());
        let dispatcher =
            EnrichmentDispatcher::new(store.clone(), enricher, config.enrich_concurrency);

        Self {
            sources,
            store,
            dispatcher,
            notifier,
            refresh_gate: Mutex::new(()),
            refresh_interval_secs: config.refresh_interval_secs,
            source_timeout: Duration::from_secs(config.source_timeout_secs),
            max_items: config.max_items,
        }
    }

    /// The observable state surface consumed by rendering.
    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    pub fn dispatcher(&self) -> &Arc<EnrichmentDispatcher> {
        &self.dispatcher
    }

    /// Runs one fetch, merge and publish cycle. Manual triggers and the
    /// scheduler share this code path; overlapping invocations are rejected
    /// rather than queued.
    pub async fn refresh(&self) -> RefreshOutcome {
        let Ok(_guard) = self.refresh_gate.try_lock() else {
            debug!("Refresh already in progress, rejecting overlapping trigger");
            return RefreshOutcome::AlreadyRunning;
        };

        self.store.set_loading(true).await;
        let outcome = self.run_cycle().await;
        self.store.set_loading(false).await;
        outcome
    }

    async fn run_cycle(&self) -> RefreshOutcome {
        let fetches = self.sources.iter().map(|source| {
            let source = Arc::clone(source);
            let per_source_timeout = self.source_timeout;
            async move {
                let config = source.config().clone();
                let result = match timeout(per_source_timeout, source.fetch()).await {
                    Ok(result) => result,
                    Err(_) => Err(DashboardError::General(format!(
                        "source {} timed out after {:?}",
                        config.id, per_source_timeout
                    ))),
                };
                (config, result)
            }
        });

        let results = future::join_all(fetches).await;

        let mut fresh: Vec<NewsItem> = Vec::new();
        let mut successes = 0usize;
        for (config, result) in results {
            match result {
                Ok(entries) => {
                    successes += 1;
                    debug!("Source {} contributed {} entries", config.id, entries.len());
                    fresh.extend(
                        entries
                            .into_iter()
                            .map(|entry| NewsItem::from_entry(&config.id, entry)),
                    );
                }
                Err(e) => {
                    // One failing source never aborts the cycle.
                    warn!("Source {} failed this cycle: {}", config.id, e);
                }
            }
        }

        let next_update = Utc::now() + chrono::Duration::seconds(self.refresh_interval_secs as i64);

        if successes == 0 && !self.sources.is_empty() {
            warn!("Every source failed; keeping the previous snapshot");
            self.store.set_next_update(next_update).await;
            return RefreshOutcome::AllSourcesFailed;
        }

        let current = self.store.snapshot().await;
        let outcome = merge(&current, fresh, self.max_items);
        let has_new = outcome.has_new;

        info!(
            "Refresh merged {} items ({} new)",
            outcome.items.len(),
            outcome.items.iter().filter(|i| i.is_new).count()
        );
        self.store.publish(outcome.items, next_update).await;

        if has_new {
            self.announce_new_items().await;
        }

        self.dispatcher.scan().await;
        RefreshOutcome::Merged { has_new }
    }

    async fn announce_new_items(&self) {
        match self.notifier.permission().await {
            NotificationPermission::Granted => {
                if let Err(e) = self
                    .notifier
                    .notify("New AI news", "Fresh items were added to the dashboard.")
                    .await
                {
                    warn!("Notification delivery failed: {}", e);
                }
            }
            other => debug!("Notifications unavailable ({:?}), skipping announcement", other),
        }
    }

    /// External retry trigger for a failed item: resets it to pending and
    /// rescans. Returns false when the item is missing or not failed.
    pub async fn retry_item(&self, id: Uuid) -> bool {
        if !self.store.reset_for_retry(id).await {
            return false;
        }
        info!("Retrying enrichment for item {}", id);
        self.dispatcher.scan().await;
        true
    }
}
