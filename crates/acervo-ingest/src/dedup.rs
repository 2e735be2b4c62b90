//! Canonical-key deduplication against the store snapshot and the current run

use acervo_common::types::{CanonicalKey, CleanRecord};
use std::collections::HashSet;

/// Canonical keys present in the store when the run started
///
/// Loaded once per run and never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct ExistingKeySet {
    keys: HashSet<CanonicalKey>,
}

impl ExistingKeySet {
    pub fn from_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keys: terms
                .into_iter()
                .map(|term| CanonicalKey::from_term(term.as_ref()))
                .collect(),
        }
    }

    pub fn contains(&self, key: &CanonicalKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Result of one dedup pass
#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    pub accepted: Vec<CleanRecord>,
    /// Already in the store at run start
    pub skipped_existing: usize,
    /// Seen earlier in this run
    pub skipped_in_run: usize,
}

impl DedupOutcome {
    pub fn duplicates_skipped(&self) -> usize {
        self.skipped_existing + self.skipped_in_run
    }
}

/// First-occurrence-wins filter over canonical keys
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<CanonicalKey>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys accepted so far in this run
    pub fn seen(&self) -> usize {
        self.seen.len()
    }

    /// Filter candidates in input order
    ///
    /// A key is recorded as seen the moment its record is accepted, so the
    /// decision never depends on what later happens at the store.
    pub fn filter(&mut self, candidates: Vec<CleanRecord>, existing: &ExistingKeySet) -> DedupOutcome {
        let mut outcome = DedupOutcome::default();

        for record in candidates {
            let key = record.key();
            if existing.contains(&key) {
                outcome.skipped_existing += 1;
            } else if !self.seen.insert(key) {
                outcome.skipped_in_run += 1;
            } else {
                outcome.accepted.push(record);
            }
        }

        outcome
    }
}
