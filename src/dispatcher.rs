use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::SnapshotStore;
use crate::traits::Enricher;
use crate::types::{DashboardError, NewsItem, ProcessingStatus};

/// Drives pending items through the enrichment port.
///
/// The in-flight set guarantees at most one attempt per id at any instant;
/// the semaphore caps how many enrichment calls run concurrently, with
/// admission in snapshot (most recent first) order. Items already
/// processing, completed or failed are never selected by a scan.
pub struct EnrichmentDispatcher {
    store: Arc<SnapshotStore>,
    enricher: Arc<dyn Enricher>,
    in_flight: Arc<Mutex<HashSet<Uuid>>>,
    permits: Arc<Semaphore>,
}

impl EnrichmentDispatcher {
    pub fn new(
        store: Arc<SnapshotStore>,
        enricher: Arc<dyn Enricher>,
        concurrency: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            enricher,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
        })
    }

    /// One pass over the latest snapshot: starts an attempt for every
    /// pending item not already in flight. Returns how many attempts were
    /// started.
    pub async fn scan(&self) -> usize {
        let items = self.store.snapshot().await;
        let mut started = 0;

        for item in items.iter() {
            if item.status != ProcessingStatus::Pending {
                continue;
            }
            if self.begin_attempt(item.clone()).await {
                started += 1;
            }
        }

        if started > 0 {
            debug!("Dispatcher started {} enrichment attempts", started);
        }
        started
    }

    /// Number of attempts currently in flight.
    pub async fn in_flight_count(&self) -> usize {
        self.in_flight.lock().await.len()
    }

    async fn begin_attempt(&self, item: NewsItem) -> bool {
        {
            let mut in_flight = self.in_flight.lock().await;
            if !in_flight.insert(item.id) {
                return false;
            }
        }

        if !self.store.mark_processing(item.id).await {
            // The item changed status between the scan and now.
            self.in_flight.lock().await.remove(&item.id);
            return false;
        }

        let store = Arc::clone(&self.store);
        let enricher = Arc::clone(&self.enricher);
        let in_flight = Arc::clone(&self.in_flight);
        let permits = Arc::clone(&self.permits);
        tokio::spawn(async move {
            run_attempt(store, enricher, in_flight, permits, item).await;
        });
        true
    }
}

async fn run_attempt(
    store: Arc<SnapshotStore>,
    enricher: Arc<dyn Enricher>,
    in_flight: Arc<Mutex<HashSet<Uuid>>>,
    permits: Arc<Semaphore>,
    item: NewsItem,
) {
    let outcome = match permits.acquire_owned().await {
        Ok(_permit) => {
            enricher
                .enrich(&item.original_title, &item.original_content)
                .await
        }
        Err(_) => Err(DashboardError::General(
            "enrichment pool is closed".to_string(),
        )),
    };

    match outcome {
        Ok(enrichment) => {
            if store.complete(item.id, enrichment).await {
                info!("Enriched item {} (\"{}\")", item.id, item.original_title);
            } else {
                // Truncated out of the snapshot while the call ran; the
                // result is simply dropped.
                debug!(
                    "Discarding enrichment for item {} no longer in snapshot",
                    item.id
                );
            }
        }
        Err(e) => {
            warn!(
                "Enrichment failed for item {} (\"{}\"): {}",
                item.id, item.original_title, e
            );
            store.fail(item.id).await;
        }
    }

    // Every exit path of an attempt releases the id.
    in_flight.lock().await.remove(&item.id);
}
