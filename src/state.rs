use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::types::{Enrichment, NewsItem, ProcessingStatus};

#[derive(Debug, Clone)]
struct Inner {
    items: Arc<Vec<NewsItem>>,
    is_loading: bool,
    last_updated: Option<DateTime<Utc>>,
    next_update: Option<DateTime<Utc>>,
}

/// Owner of the shared snapshot and the only place item state changes.
///
/// Updates never mutate the item vector in place: each one clones, edits and
/// swaps in a fresh `Arc`, so a reader holding a snapshot always sees a
/// complete, consistent value. Status transitions are checked against the
/// item's prior status here, which makes illegal transitions (a merge or a
/// late enrichment resurrecting a completed item, a failed item re-entering
/// the scan path) impossible to express.
pub struct SnapshotStore {
    inner: RwLock<Inner>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                items: Arc::new(Vec::new()),
                is_loading: false,
                last_updated: None,
                next_update: None,
            }),
        }
    }

    /// The current snapshot as an immutable shared value.
    pub async fn snapshot(&self) -> Arc<Vec<NewsItem>> {
        self.inner.read().await.items.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.inner.read().await.is_loading
    }

    pub async fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.last_updated
    }

    pub async fn next_update(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.next_update
    }

    pub async fn set_loading(&self, loading: bool) {
        self.inner.write().await.is_loading = loading;
    }

    /// Replaces the snapshot with a merge result and stamps the refresh
    /// bookkeeping.
    pub async fn publish(&self, items: Vec<NewsItem>, next_update: DateTime<Utc>) {
        let mut inner = self.inner.write().await;
        inner.items = Arc::new(items);
        inner.last_updated = Some(Utc::now());
        inner.next_update = Some(next_update);
    }

    /// Advances the next-update stamp without touching the items; used when
    /// a cycle produced nothing publishable.
    pub async fn set_next_update(&self, at: DateTime<Utc>) {
        self.inner.write().await.next_update = Some(at);
    }

    /// Pending → Processing. Returns false when the item is gone from the
    /// snapshot or not pending.
    pub async fn mark_processing(&self, id: Uuid) -> bool {
        self.update_item(id, |item| {
            if item.status != ProcessingStatus::Pending {
                return false;
            }
            item.status = ProcessingStatus::Processing;
            true
        })
        .await
    }

    /// Processing → Completed, recording the enrichment payload.
    pub async fn complete(&self, id: Uuid, enrichment: Enrichment) -> bool {
        self.update_item(id, |item| {
            if item.status != ProcessingStatus::Processing {
                return false;
            }
            item.status = ProcessingStatus::Completed;
            item.translated_title = Some(enrichment.translated_title);
            item.summary = Some(enrichment.summary);
            true
        })
        .await
    }

    /// Processing → Failed.
    pub async fn fail(&self, id: Uuid) -> bool {
        self.update_item(id, |item| {
            if item.status != ProcessingStatus::Processing {
                return false;
            }
            item.status = ProcessingStatus::Failed;
            true
        })
        .await
    }

    /// Failed → Pending. The explicit retry trigger; the automatic scan
    /// never takes this path.
    pub async fn reset_for_retry(&self, id: Uuid) -> bool {
        self.update_item(id, |item| {
            if item.status != ProcessingStatus::Failed {
                return false;
            }
            item.status = ProcessingStatus::Pending;
            true
        })
        .await
    }

    async fn update_item<F>(&self, id: Uuid, apply: F) -> bool
    where
        F: FnOnce(&mut NewsItem) -> bool,
    {
        let mut inner = self.inner.write().await;
        let mut items: Vec<NewsItem> = inner.items.as_ref().clone();
        let Some(item) = items.iter_mut().find(|item| item.id == id) else {
            return false;
        };
        if !apply(item) {
            return false;
        }
        inner.items = Arc::new(items);
        true
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
