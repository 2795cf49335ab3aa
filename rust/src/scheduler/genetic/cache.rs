//! Per-run memoization of candidate decodes.
//!
//! Identical orderings always decode to identical schedules, so each distinct
//! ordering is decoded once. A cache belongs to exactly one search run and is
//! dropped with it.

use rustc_hash::FxHashMap;

use crate::models::DailyAllocation;
use crate::scheduler::greedy::GreedyOutcome;

/// A candidate ordering decoded against an empty ledger.
#[derive(Clone, Debug)]
pub struct DecodedCandidate {
    pub fitness: f64,
    pub outcome: GreedyOutcome,
    /// Aggregate hours per date produced by this decode alone
    pub allocation: DailyAllocation,
}

/// Decode results keyed by the ordered task indices of a candidate.
#[derive(Debug, Default)]
pub struct DecodeCache {
    entries: FxHashMap<Vec<usize>, DecodedCandidate>,
    hits: usize,
    misses: usize,
}

impl DecodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached decode for `key`, running `decode` on a miss.
    pub fn get_or_decode<F>(&mut self, key: &[usize], decode: F) -> &DecodedCandidate
    where
        F: FnOnce() -> DecodedCandidate,
    {
        if self.entries.contains_key(key) {
            self.hits += 1;
        } else {
            self.misses += 1;
            self.entries.insert(key.to_vec(), decode());
        }
        &self.entries[key]
    }

    pub fn get(&self, key: &[usize]) -> Option<&DecodedCandidate> {
        self.entries.get(key)
    }

    /// Remove and return a cached decode.
    pub fn take(&mut self, key: &[usize]) -> Option<DecodedCandidate> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }
}
