/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The indexed in-memory triple store. Holds a set of triples with set
//! semantics and three permutation indexes (SPO/POS/OSP), protected by a
//! single read-write lock so many readers or one writer proceed at a time.
//!
//! The public contract is entirely string-based: callers never see the
//! internal dictionary ids. An empty string in any position of a pattern
//! acts as a wildcard.

use std::sync::{Arc, RwLock};

use log::{debug, trace};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::dictionary::Dictionary;
use crate::index::TripleIndexes;
use crate::stats::StatisticsView;
use crate::triple::{StringTriple, Triple};

#[derive(Debug, Default)]
struct Inner {
    dictionary: Dictionary,
    indexes: TripleIndexes,
    triples: FxHashSet<Triple>,
    subject_counts: FxHashMap<u32, u64>,
    predicate_counts: FxHashMap<u32, u64>,
    object_counts: FxHashMap<u32, u64>,
}

impl Inner {
    fn insert(&mut self, t: Triple) -> bool {
        if !self.triples.insert(t) {
            return false;
        }
        self.indexes.insert(t);
        *self.subject_counts.entry(t.subject).or_insert(0) += 1;
        *self.predicate_counts.entry(t.predicate).or_insert(0) += 1;
        *self.object_counts.entry(t.object).or_insert(0) += 1;
        true
    }

    fn remove(&mut self, t: Triple) -> bool {
        if !self.triples.remove(&t) {
            return false;
        }
        self.indexes.remove(t);
        decrement(&mut self.subject_counts, t.subject);
        decrement(&mut self.predicate_counts, t.predicate);
        decrement(&mut self.object_counts, t.object);
        true
    }
}

fn decrement(map: &mut FxHashMap<u32, u64>, key: u32) {
    if let Some(c) = map.get_mut(&key) {
        *c -= 1;
        if *c == 0 {
            map.remove(&key);
        }
    }
}

/// A cheaply-cloneable handle to the shared store state. Clones refer to the
/// same underlying data; there is no deep copy.
#[derive(Debug, Clone, Default)]
pub struct TripleStore {
    inner: Arc<RwLock<Inner>>,
}

impl TripleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, subject: &str, predicate: &str, object: &str) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let s = inner.dictionary.encode(subject);
        let p = inner.dictionary.encode(predicate);
        let o = inner.dictionary.encode(object);
        inner.insert(Triple::new(s, p, o));
        trace!(
            "store.add({subject:?}, {predicate:?}, {object:?}) -> {} triples",
            inner.triples.len()
        );
    }

    /// Inserts every triple in `items` under a single write-lock acquisition,
    /// so readers never observe a partially-applied batch.
    pub fn bulk_add(&self, items: &[(&str, &str, &str)]) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        for &(s, p, o) in items {
            let s = inner.dictionary.encode(s);
            let p = inner.dictionary.encode(p);
            let o = inner.dictionary.encode(o);
            inner.insert(Triple::new(s, p, o));
        }
        debug!(
            "store.bulk_add({} items) -> {} triples",
            items.len(),
            inner.triples.len()
        );
    }

    pub fn delete(&self, subject: &str, predicate: &str, object: &str) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let pattern = match resolve_pattern(&inner.dictionary, subject, predicate, object) {
            Some(p) => p,
            None => return, // a bound term never seen before matches nothing
        };
        let matches = inner.indexes.find(pattern.0, pattern.1, pattern.2);
        for t in matches {
            inner.remove(t);
        }
        debug!(
            "store.delete({subject:?}, {predicate:?}, {object:?}) -> {} triples remain",
            inner.triples.len()
        );
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.indexes.clear();
        inner.triples.clear();
        inner.subject_counts.clear();
        inner.predicate_counts.clear();
        inner.object_counts.clear();
        inner.dictionary.clear();
        debug!("store.clear()");
    }

    /// Matches `subject`/`predicate`/`object`, treating `""` as a wildcard
    /// in that position. Result ordering is unspecified but duplicate-free.
    pub fn find(&self, subject: &str, predicate: &str, object: &str) -> Vec<StringTriple> {
        let inner = self.inner.read().expect("store lock poisoned");
        let pattern = match resolve_pattern(&inner.dictionary, subject, predicate, object) {
            Some(p) => p,
            None => return Vec::new(), // a bound term never seen before matches nothing
        };
        inner
            .indexes
            .find(pattern.0, pattern.1, pattern.2)
            .into_iter()
            .map(|t| decode_triple(&inner.dictionary, t))
            .collect()
    }

    /// Returns predicate -> objects for `subject`. Equivalent to
    /// `find(subject, "", "")` regrouped by predicate.
    pub fn get(&self, subject: &str) -> FxHashMap<String, Vec<String>> {
        let mut grouped: FxHashMap<String, Vec<String>> = FxHashMap::default();
        for t in self.find(subject, "", "") {
            grouped.entry(t.predicate).or_default().push(t.object);
        }
        grouped
    }

    pub fn count(&self) -> u64 {
        self.inner.read().expect("store lock poisoned").triples.len() as u64
    }

    pub fn subjects(&self) -> Vec<String> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner
            .subject_counts
            .keys()
            .filter_map(|&id| inner.dictionary.decode(id).map(str::to_string))
            .collect()
    }

    pub fn predicates(&self) -> Vec<String> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner
            .predicate_counts
            .keys()
            .filter_map(|&id| inner.dictionary.decode(id).map(str::to_string))
            .collect()
    }

    pub fn objects(&self) -> Vec<String> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner
            .object_counts
            .keys()
            .filter_map(|&id| inner.dictionary.decode(id).map(str::to_string))
            .collect()
    }

    /// Snapshots the cardinality maps the planner needs. Values reflect a
    /// moment between mutation operations; the snapshot is an owned copy, not
    /// a view into the live store.
    pub fn stats(&self) -> StatisticsView {
        let inner = self.inner.read().expect("store lock poisoned");
        StatisticsView {
            total_triples: inner.triples.len() as u64,
            subject_cardinality: inner.subject_counts.clone(),
            predicate_cardinality: inner.predicate_counts.clone(),
            object_cardinality: inner.object_counts.clone(),
        }
    }

    /// Resolves a term string to its dictionary id without creating a new
    /// entry. Used by the executor so that binding lookups never pollute the
    /// dictionary with terms that appear only in query text.
    pub(crate) fn lookup(&self, s: &str) -> Option<u32> {
        self.inner.read().expect("store lock poisoned").dictionary.lookup(s)
    }

    pub(crate) fn decode(&self, id: u32) -> Option<String> {
        self.inner
            .read()
            .expect("store lock poisoned")
            .dictionary
            .decode(id)
            .map(str::to_string)
    }
}

/// Resolves a string pattern to dictionary ids. Each position is `None` for
/// a wildcard (`""`) or `Some(id)` for a bound term. Returns `None` as a
/// whole if any bound term has never been interned, since such a term
/// cannot possibly match a stored triple.
fn resolve_pattern(
    dict: &Dictionary,
    subject: &str,
    predicate: &str,
    object: &str,
) -> Option<(Option<u32>, Option<u32>, Option<u32>)> {
    Some((
        bound_term(dict, subject)?,
        bound_term(dict, predicate)?,
        bound_term(dict, object)?,
    ))
}

fn bound_term(dict: &Dictionary, s: &str) -> Option<Option<u32>> {
    if s.is_empty() {
        Some(None)
    } else {
        dict.lookup(s).map(Some)
    }
}

fn decode_triple(dict: &Dictionary, t: Triple) -> StringTriple {
    StringTriple {
        subject: dict.decode(t.subject).unwrap_or_default().to_string(),
        predicate: dict.decode(t.predicate).unwrap_or_default().to_string(),
        object: dict.decode(t.object).unwrap_or_default().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_find_round_trip() {
        let store = TripleStore::new();
        store.add("main.go", "exports", "main");
        store.add("main.go", "linksTo", "utils.go");

        let results = store.find("main.go", "", "");
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn duplicate_add_does_not_grow_count() {
        let store = TripleStore::new();
        store.add("a", "p", "b");
        store.add("a", "p", "b");
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn find_with_full_wildcard_returns_everything() {
        let store = TripleStore::new();
        store.add("a", "p", "b");
        store.add("c", "q", "d");
        assert_eq!(store.find("", "", "").len(), 2);
    }

    #[test]
    fn find_on_unknown_term_returns_empty_not_panic() {
        let store = TripleStore::new();
        store.add("a", "p", "b");
        assert!(store.find("nonexistent", "", "").is_empty());
    }

    #[test]
    fn delete_removes_matching_triples_only() {
        let store = TripleStore::new();
        store.add("a", "p", "b");
        store.add("a", "p", "c");
        store.delete("a", "p", "b");
        assert_eq!(store.count(), 1);
        assert_eq!(store.find("a", "p", ""), store.find("", "", "c"));
    }

    #[test]
    fn delete_nonexistent_pattern_is_a_silent_no_op() {
        let store = TripleStore::new();
        store.add("a", "p", "b");
        store.delete("x", "y", "z");
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn clear_empties_everything() {
        let store = TripleStore::new();
        store.add("a", "p", "b");
        store.clear();
        assert_eq!(store.count(), 0);
        assert!(store.subjects().is_empty());
        assert!(store.find("", "", "").is_empty());
    }

    #[test]
    fn term_universes_match_projections_of_the_live_set() {
        let store = TripleStore::new();
        store.add("a", "p", "b");
        store.add("a", "q", "c");
        store.add("d", "p", "b");
        assert_eq!(store.subjects().len(), 2);
        assert_eq!(store.predicates().len(), 2);
        assert_eq!(store.objects().len(), 2);
    }

    #[test]
    fn stats_reports_total_and_cardinalities() {
        let store = TripleStore::new();
        store.add("a", "p", "b");
        store.add("d", "p", "b");
        let stats = store.stats();
        assert_eq!(stats.total_triples, 2);
        let p_id = store.lookup("p").unwrap();
        assert_eq!(stats.predicate_count(p_id), Some(2));
    }

    #[test]
    fn get_groups_by_predicate() {
        let store = TripleStore::new();
        store.add("a", "p", "b");
        store.add("a", "p", "c");
        store.add("a", "q", "d");
        let grouped = store.get("a");
        assert_eq!(grouped.get("p").map(|v| v.len()), Some(2));
        assert_eq!(grouped.get("q").map(|v| v.len()), Some(1));
    }

    #[test]
    fn bulk_add_is_visible_atomically() {
        let store = TripleStore::new();
        store.bulk_add(&[("a", "p", "b"), ("a", "p", "c"), ("a", "p", "b")]);
        assert_eq!(store.count(), 2);
    }
}
