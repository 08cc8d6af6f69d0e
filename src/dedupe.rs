use crate::models::CleanedEntry;
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupeStats {
    pub kept: usize,
    pub dupes: usize,
}

/// Keeps the first entry seen for each dedupe key, in input order.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
    stats: DedupeStats,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the entry is the first with its key.
    pub fn admit(&mut self, entry: &CleanedEntry) -> bool {
        let key = entry.dedupe_key();
        if self.seen.contains(&key) {
            debug!("dupe detected for key {}", key);
            self.stats.dupes += 1;
            return false;
        }
        self.seen.insert(key);
        self.stats.kept += 1;
        true
    }

    pub fn stats(&self) -> &DedupeStats {
        &self.stats
    }

    pub fn into_stats(self) -> DedupeStats {
        self.stats
    }
}

/// Drops later repeats of a key, keeping input order.
pub fn deduplicate<I>(entries: I) -> (Vec<CleanedEntry>, DedupeStats)
where
    I: IntoIterator<Item = CleanedEntry>,
{
    let mut dedupe = Deduplicator::new();
    let kept: Vec<CleanedEntry> = entries
        .into_iter()
        .filter(|entry| dedupe.admit(entry))
        .collect();
    (kept, dedupe.into_stats())
}
