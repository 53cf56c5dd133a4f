use async_trait::async_trait;

use crate::types::{Enrichment, FeedConfig, RawEntry, Result};

/// Trait for pulling the current entries of one configured feed.
///
/// Each call returns the feed's full current listing in a canonical shape;
/// source-specific parsing concerns live entirely behind this trait.
/// Failures are per-source and must not take down the refresh cycle.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// The static descriptor this source was configured with.
    fn config(&self) -> &FeedConfig;

    /// Fetch the feed's current entries.
    async fn fetch(&self) -> Result<Vec<RawEntry>>;
}

/// Trait for the external translate+summarize collaborator.
#[async_trait]
pub trait Enricher: Send + Sync {
    /// Human-readable name, used in logs.
    fn name(&self) -> String;

    /// Translate the title and produce a summary for one item. May fail
    /// (timeout, quota, malformed response); a failure is local to the item.
    async fn enrich(&self, title: &str, content: &str) -> Result<Enrichment>;
}

/// Delivery capability state of the notification port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPermission {
    Granted,
    Denied,
    /// No notification capability exists in this environment at all.
    Unsupported,
}

/// Trait for announcing that a refresh produced new items.
///
/// The pipeline only ever branches on the permission value, never on the
/// concrete implementation.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn permission(&self) -> NotificationPermission;

    async fn notify(&self, title: &str, body: &str) -> Result<()>;
}
