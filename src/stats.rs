/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Read-only snapshot of store cardinalities, consumed exclusively by the
//! [`crate::planner`].

use rustc_hash::FxHashMap;

/// A point-in-time view over the store's term cardinalities. Cheap to clone;
/// produced by [`crate::store::TripleStore::stats`].
#[derive(Debug, Clone, Default)]
pub struct StatisticsView {
    pub total_triples: u64,
    pub subject_cardinality: FxHashMap<u32, u64>,
    pub predicate_cardinality: FxHashMap<u32, u64>,
    pub object_cardinality: FxHashMap<u32, u64>,
}

impl StatisticsView {
    pub fn subject_count(&self, id: u32) -> Option<u64> {
        self.subject_cardinality.get(&id).copied()
    }

    pub fn predicate_count(&self, id: u32) -> Option<u64> {
        self.predicate_cardinality.get(&id).copied()
    }

    pub fn object_count(&self, id: u32) -> Option<u64> {
        self.object_cardinality.get(&id).copied()
    }
}
