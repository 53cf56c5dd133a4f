use std::collections::HashSet;

use chrono::Utc;
use feed_rs::parser;
use tracing::debug;

use crate::types::{DashboardError, RawEntry, Result};

/// Parses an RSS/Atom document into canonical raw entries.
///
/// Entries without a link are skipped (there is nothing to identify them
/// by); duplicate links within one document collapse to the first
/// occurrence. Missing publication dates fall back to the update date, then
/// to the parse time, so every entry carries a sortable timestamp.
pub fn parse_entries(content: &str) -> Result<Vec<RawEntry>> {
    let feed = parser::parse(content.as_bytes())
        .map_err(|e| DashboardError::Parse(format!("failed to parse feed: {}", e)))?;

    let mut seen_links: HashSet<String> = HashSet::new();
    let mut entries = Vec::new();

    for entry in feed.entries {
        let Some(link) = entry.links.first().map(|l| l.href.clone()) else {
            debug!("Skipping entry without a link");
            continue;
        };
        if !seen_links.insert(link.clone()) {
            debug!("Skipping duplicate entry: {}", link);
            continue;
        }

        let title = entry
            .title
            .map(|t| t.content)
            .unwrap_or_else(|| "Untitled".to_string());

        let summary = entry.summary.map(|s| s.content);
        let content_body = entry
            .content
            .and_then(|c| c.body)
            .or(summary)
            .unwrap_or_default();

        let published_at = entry
            .published
            .or(entry.updated)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        entries.push(RawEntry {
            title,
            content: content_body,
            link,
            published_at,
        });
    }

    Ok(entries)
}
