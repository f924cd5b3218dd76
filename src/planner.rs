/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Cost-based reordering of a query's `WHERE` patterns. The planner never
//! changes the result set, only the order in which patterns are joined; it
//! exists purely to shrink the intermediate binding sets a nested-loop join
//! has to carry.

use log::debug;
use rayon::prelude::*;

use crate::ast::{SelectQuery, TriplePattern};
use crate::stats::StatisticsView;
use crate::store::TripleStore;
use crate::term::Term;

const UNKNOWN_TERM_SELECTIVITY: f64 = 0.1;
const MIN_SELECTIVITY: f64 = 0.1;

/// Estimates how selective `pattern` is against `stats`: lower means fewer
/// matches expected. Unbound positions don't narrow the estimate at all;
/// bound positions whose term was never seen in the store are treated as
/// maximally selective, since they are guaranteed to match nothing.
fn estimate_selectivity(pattern: &TriplePattern, stats: &StatisticsView, store: &TripleStore) -> f64 {
    let total = stats.total_triples.max(1) as f64;
    let mut estimate = total;
    let mut narrowed = false;

    let mut apply = |term: &Term, lookup: &dyn Fn(u32) -> Option<u64>| {
        if term.is_variable() {
            return;
        }
        let count = store
            .lookup(term.text())
            .and_then(lookup)
            .map(|c| c as f64)
            .unwrap_or(total * UNKNOWN_TERM_SELECTIVITY);
        if !narrowed {
            estimate = count;
            narrowed = true;
        } else {
            estimate *= count / total;
        }
    };

    apply(&pattern.0, &|id| stats.subject_count(id));
    apply(&pattern.1, &|id| stats.predicate_count(id));
    apply(&pattern.2, &|id| stats.object_count(id));

    (estimate / total).max(MIN_SELECTIVITY)
}

/// Returns a copy of `query` whose `WHERE` patterns are stably sorted
/// ascending by estimated selectivity. Every other field is preserved
/// verbatim.
pub fn plan(query: &SelectQuery, store: &TripleStore) -> SelectQuery {
    if query.where_clause.len() <= 1 {
        return query.clone();
    }

    let stats = store.stats();
    // Selectivity estimation touches only the read-locked store and the
    // owned stats snapshot, so scoring every pattern is embarrassingly
    // parallel; this mirrors how the corpus leans on rayon for its own
    // cost-estimation passes over per-term cardinalities.
    let mut scored: Vec<(f64, TriplePattern)> = query
        .where_clause
        .par_iter()
        .cloned()
        .map(|p| (estimate_selectivity(&p, &stats, store), p))
        .collect();

    scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    for (selectivity, pattern) in &scored {
        debug!("planner: selectivity {selectivity:.4} for pattern {pattern:?}");
    }

    let mut planned = query.clone();
    planned.where_clause = scored.into_iter().map(|(_, p)| p).collect();
    planned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Projection;

    fn pattern(s: &str, p: &str, o: &str) -> TriplePattern {
        (Term::Variable(s.into()), Term::Uri(p.into()), Term::Variable(o.into()))
    }

    #[test]
    fn single_pattern_queries_are_left_unchanged() {
        let store = TripleStore::new();
        let query = SelectQuery {
            where_clause: vec![pattern("s", "type", "o")],
            ..Default::default()
        };
        let planned = plan(&query, &store);
        assert_eq!(planned.where_clause, query.where_clause);
    }

    #[test]
    fn most_selective_pattern_moves_first() {
        let store = TripleStore::new();
        for i in 0..100 {
            store.add(&format!("m{i}"), "type", "Module");
        }
        for i in 0..50 {
            store.add(&format!("m{i}"), "language", "go");
        }
        for i in 0..10 {
            store.add(&format!("m{i}"), "exports", "main");
        }

        let query = SelectQuery {
            where_clause: vec![
                pattern("m", "type", "t"),
                pattern("m", "language", "l"),
                pattern("m", "exports", "e"),
            ],
            projection: Projection::All,
            ..Default::default()
        };
        let planned = plan(&query, &store);
        assert_eq!(planned.where_clause[0].1, Term::Uri("exports".into()));
        assert_eq!(planned.where_clause[2].1, Term::Uri("type".into()));
    }

    #[test]
    fn planner_preserves_every_other_field() {
        let store = TripleStore::new();
        let query = SelectQuery {
            where_clause: vec![pattern("a", "p", "b"), pattern("c", "q", "d")],
            distinct: true,
            limit: 5,
            offset: 2,
            ..Default::default()
        };
        let planned = plan(&query, &store);
        assert!(planned.distinct);
        assert_eq!(planned.limit, 5);
        assert_eq!(planned.offset, 2);
    }
}
