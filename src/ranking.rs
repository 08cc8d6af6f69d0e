use crate::models::{CleanedEntry, Division};
use std::collections::BTreeMap;

/// Ranked entries per classifier code and division.
///
/// Each group is sorted by hit factor descending with a stable sort, so equal
/// hit factors keep their input order. Groups iterate in key order, which keeps
/// output identical across runs on the same input.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ClassifierBuckets {
    groups: BTreeMap<String, BTreeMap<Division, Vec<CleanedEntry>>>,
}

impl ClassifierBuckets {
    /// Groups entries in arrival order, then ranks every group.
    pub fn build<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = CleanedEntry>,
    {
        let mut groups: BTreeMap<String, BTreeMap<Division, Vec<CleanedEntry>>> = BTreeMap::new();
        for entry in entries {
            groups
                .entry(entry.stage_classifier_code.clone())
                .or_default()
                .entry(entry.division)
                .or_default()
                .push(entry);
        }

        for divisions in groups.values_mut() {
            for ranked in divisions.values_mut() {
                rank_by_hit_factor(ranked);
            }
        }

        Self { groups }
    }

    pub fn group(&self, code: &str, division: Division) -> Option<&[CleanedEntry]> {
        self.groups
            .get(code)
            .and_then(|divisions| divisions.get(&division))
            .map(Vec::as_slice)
    }

    pub fn group_count(&self) -> usize {
        self.groups.values().map(BTreeMap::len).sum()
    }

    pub fn entry_count(&self) -> usize {
        self.groups
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Division, &[CleanedEntry])> {
        self.groups.iter().flat_map(|(code, divisions)| {
            divisions
                .iter()
                .map(move |(division, ranked)| (code.as_str(), *division, ranked.as_slice()))
        })
    }

    /// Consumes the buckets, yielding each group once.
    pub fn into_groups(self) -> impl Iterator<Item = RankedGroup> {
        self.groups.into_iter().flat_map(|(code, divisions)| {
            divisions.into_iter().map(move |(division, entries)| RankedGroup {
                code: code.clone(),
                division,
                entries,
            })
        })
    }
}

/// One ranked (classifier, division) group, owned.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedGroup {
    pub code: String,
    pub division: Division,
    pub entries: Vec<CleanedEntry>,
}

impl RankedGroup {
    /// The full ranking.
    pub fn all(&self) -> &[CleanedEntry] {
        &self.entries
    }

    /// The first `n` entries of the full ranking, without touching it.
    pub fn top(&self, n: usize) -> &[CleanedEntry] {
        top_slice(&self.entries, n)
    }
}

pub fn top_slice(ranked: &[CleanedEntry], n: usize) -> &[CleanedEntry] {
    &ranked[..ranked.len().min(n)]
}

/// Highest hit factor first. `sort_by` is stable.
pub fn rank_by_hit_factor(entries: &mut [CleanedEntry]) {
    entries.sort_by(|a, b| b.hit_factor.total_cmp(&a.hit_factor));
}
