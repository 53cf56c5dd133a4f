use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::types::NewsItem;

/// Result of merging a fresh batch into the current snapshot.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub items: Vec<NewsItem>,
    /// True when at least one item created by this merge survives
    /// truncation; drives the notification decision for the cycle.
    pub has_new: bool,
}

/// Merges a freshly fetched batch into the current snapshot.
///
/// Pure transform: the caller publishes the result. Ids already present in
/// the snapshot keep their existing item untouched (status and enrichment
/// progress survive, even if the raw feed content drifted between fetches),
/// except that the `is_new` marker expires on carry-over. Ids seen for the
/// first time enter as pending items marked new. Items the fresh batch no
/// longer lists drop out. The result is sorted by `published_at` descending
/// (ties broken by ascending id, so equal timestamps order the same way
/// every cycle) and truncated to `max_items`.
pub fn merge(current: &[NewsItem], fresh: Vec<NewsItem>, max_items: usize) -> MergeOutcome {
    let existing: HashMap<Uuid, &NewsItem> = current.iter().map(|item| (item.id, item)).collect();

    let mut merged: Vec<NewsItem> = Vec::with_capacity(fresh.len());
    let mut seen: HashSet<Uuid> = HashSet::with_capacity(fresh.len());

    for candidate in fresh {
        if !seen.insert(candidate.id) {
            // Duplicate within the batch (same article listed twice).
            continue;
        }
        match existing.get(&candidate.id) {
            Some(prev) => {
                let mut kept = (*prev).clone();
                kept.is_new = false;
                merged.push(kept);
            }
            None => merged.push(candidate),
        }
    }

    merged.sort_by(|a, b| {
        b.published_at
            .cmp(&a.published_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    merged.truncate(max_items);

    let has_new = merged.iter().any(|item| item.is_new);
    MergeOutcome {
        items: merged,
        has_new,
    }
}
