use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::item_id;

/// Static configuration for one content source. The set of feeds is fixed
/// for a process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub id: String,
    pub name: String,
    pub url: String,
    /// Accent color used by the dashboard legend; opaque to the pipeline.
    #[serde(default)]
    pub color: String,
}

/// A raw entry as returned by a feed source, before identity assignment.
#[derive(Debug, Clone)]
pub struct RawEntry {
    pub title: String,
    pub content: String,
    pub link: String,
    pub published_at: DateTime<Utc>,
}

/// Per-item enrichment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Payload of a successful enrichment call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrichment {
    pub translated_title: String,
    pub summary: String,
}

/// A single piece of content moving through the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct NewsItem {
    pub id: Uuid,
    pub source_id: String,
    pub original_title: String,
    pub original_content: String,
    pub link: String,
    pub published_at: DateTime<Utc>,
    pub status: ProcessingStatus,
    pub translated_title: Option<String>,
    pub summary: Option<String>,
    /// Set when the id was absent from the previous snapshot; cleared the
    /// next time a merge carries the item over.
    pub is_new: bool,
}

impl NewsItem {
    /// Builds the item a merge creates when an id is observed for the first
    /// time: identified, pending, marked new.
    pub fn from_entry(source_id: &str, entry: RawEntry) -> Self {
        Self {
            id: item_id(source_id, &entry.link),
            source_id: source_id.to_string(),
            original_title: entry.title,
            original_content: entry.content,
            link: entry.link,
            published_at: entry.published_at,
            status: ProcessingStatus::Pending,
            translated_title: None,
            summary: None,
            is_new: true,
        }
    }
}

/// HTTP fetch tuning knobs.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_feed_size_mb: usize,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "newsdash/0.1".to_string(),
            timeout_seconds: 30,
            max_retries: 2,
            retry_delay_seconds: 2,
            max_feed_size_mb: 10,
            max_redirects: 5,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Enrichment error: {0}")]
    Enrichment(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
