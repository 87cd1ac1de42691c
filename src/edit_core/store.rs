use std::collections::HashMap;

use super::normalizer::CanonicalEdit;

/// Running totals for one article
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateEntry {
    pub edit_count: u64,
    pub cumulative_abs_byte_delta: u64,
}

/// Post-fold state of one title, reported for every in-scope live edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub title: String,
    pub edit_count: u64,
    pub cumulative_abs_byte_delta: u64,
}

/// Per-article aggregates for the lifetime of the process
///
/// `fold` is the only mutation. Callers hold the store by `&mut`, so there is exactly
/// one writer and nobody can read an entry between its count and byte updates.
#[derive(Debug, Default)]
pub struct AggregateStore {
    entries: HashMap<String, AggregateEntry>,
}

impl AggregateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one in-scope edit and return the title's new edit count.
    ///
    /// Scope is not checked here.
    pub fn fold(&mut self, edit: &CanonicalEdit) -> u64 {
        self.fold_entry(edit).edit_count
    }

    /// Same as `fold`, reporting both counters from the same update
    pub fn fold_observed(&mut self, edit: &CanonicalEdit) -> Observation {
        let entry = self.fold_entry(edit);
        Observation {
            title: edit.article_title.clone(),
            edit_count: entry.edit_count,
            cumulative_abs_byte_delta: entry.cumulative_abs_byte_delta,
        }
    }

    fn fold_entry(&mut self, edit: &CanonicalEdit) -> AggregateEntry {
        let entry = self
            .entries
            .entry(edit.article_title.clone())
            .or_default();
        // Counters saturate at u64::MAX
        entry.edit_count = entry.edit_count.saturating_add(1);
        entry.cumulative_abs_byte_delta = entry
            .cumulative_abs_byte_delta
            .saturating_add(edit.byte_delta.unsigned_abs());
        *entry
    }

    pub fn get(&self, title: &str) -> Option<&AggregateEntry> {
        self.entries.get(title)
    }

    /// Number of distinct titles seen
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AggregateEntry)> {
        self.entries.iter().map(|(title, entry)| (title.as_str(), entry))
    }

    /// Sum of edit counts over all titles
    pub fn total_edits(&self) -> u64 {
        self.entries.values().map(|e| e.edit_count).sum()
    }

    /// Most edited titles, ties broken alphabetically
    pub fn top_by_edit_count(&self, n: usize) -> Vec<(&str, AggregateEntry)> {
        let mut ranked: Vec<(&str, AggregateEntry)> = self
            .entries
            .iter()
            .map(|(title, entry)| (title.as_str(), *entry))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.edit_count
                .cmp(&a.1.edit_count)
                .then_with(|| a.0.cmp(b.0))
        });
        ranked.truncate(n);
        ranked
    }
}
