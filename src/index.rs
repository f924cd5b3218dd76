/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The three permutation indexes backing [`crate::store::TripleStore`]:
//! SPO, POS, and OSP. Each maps its first two dimensions to a set of the
//! third, which is enough to answer any of the eight bound/unbound
//! combinations with at most one hash traversal of the narrowest known
//! dimension.

use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

use crate::triple::Triple;

type Level2 = FxHashMap<u32, BTreeSet<u32>>;
type Level1 = FxHashMap<u32, Level2>;

#[derive(Debug, Default)]
pub struct TripleIndexes {
    spo: Level1,
    pos: Level1,
    osp: Level1,
}

impl TripleIndexes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, t: Triple) {
        insert_into(&mut self.spo, t.subject, t.predicate, t.object);
        insert_into(&mut self.pos, t.predicate, t.object, t.subject);
        insert_into(&mut self.osp, t.object, t.subject, t.predicate);
    }

    pub fn remove(&mut self, t: Triple) {
        remove_from(&mut self.spo, t.subject, t.predicate, t.object);
        remove_from(&mut self.pos, t.predicate, t.object, t.subject);
        remove_from(&mut self.osp, t.object, t.subject, t.predicate);
    }

    pub fn contains(&self, t: Triple) -> bool {
        self.spo
            .get(&t.subject)
            .and_then(|m| m.get(&t.predicate))
            .map(|set| set.contains(&t.object))
            .unwrap_or(false)
    }

    pub fn clear(&mut self) {
        self.spo.clear();
        self.pos.clear();
        self.osp.clear();
    }

    /// Narrowest-dimension lookup: picks the index whose first bound
    /// dimension matches the pattern, then filters down from there.
    pub fn find(&self, s: Option<u32>, p: Option<u32>, o: Option<u32>) -> Vec<Triple> {
        match (s, p, o) {
            (Some(s), Some(p), Some(o)) => {
                if self.contains(Triple::new(s, p, o)) {
                    vec![Triple::new(s, p, o)]
                } else {
                    vec![]
                }
            }
            (Some(s), Some(p), None) => self
                .spo
                .get(&s)
                .and_then(|m| m.get(&p))
                .map(|set| set.iter().map(|&o| Triple::new(s, p, o)).collect())
                .unwrap_or_default(),
            (Some(s), None, Some(o)) => self
                .osp
                .get(&o)
                .and_then(|m| m.get(&s))
                .map(|set| set.iter().map(|&p| Triple::new(s, p, o)).collect())
                .unwrap_or_default(),
            (None, Some(p), Some(o)) => self
                .pos
                .get(&p)
                .and_then(|m| m.get(&o))
                .map(|set| set.iter().map(|&s| Triple::new(s, p, o)).collect())
                .unwrap_or_default(),
            (Some(s), None, None) => self
                .spo
                .get(&s)
                .map(|m| {
                    m.iter()
                        .flat_map(|(&p, os)| os.iter().map(move |&o| Triple::new(s, p, o)))
                        .collect()
                })
                .unwrap_or_default(),
            (None, Some(p), None) => self
                .pos
                .get(&p)
                .map(|m| {
                    m.iter()
                        .flat_map(|(&o, ss)| ss.iter().map(move |&s| Triple::new(s, p, o)))
                        .collect()
                })
                .unwrap_or_default(),
            (None, None, Some(o)) => self
                .osp
                .get(&o)
                .map(|m| {
                    m.iter()
                        .flat_map(|(&s, ps)| ps.iter().map(move |&p| Triple::new(s, p, o)))
                        .collect()
                })
                .unwrap_or_default(),
            (None, None, None) => self
                .spo
                .iter()
                .flat_map(|(&s, m)| {
                    m.iter()
                        .flat_map(move |(&p, os)| os.iter().map(move |&o| Triple::new(s, p, o)))
                })
                .collect(),
        }
    }
}

fn insert_into(index: &mut Level1, a: u32, b: u32, c: u32) {
    index.entry(a).or_default().entry(b).or_default().insert(c);
}

fn remove_from(index: &mut Level1, a: u32, b: u32, c: u32) {
    if let Some(level2) = index.get_mut(&a) {
        if let Some(set) = level2.get_mut(&b) {
            set.remove(&c);
            if set.is_empty() {
                level2.remove(&b);
            }
        }
        if level2.is_empty() {
            index.remove(&a);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TripleIndexes {
        let mut idx = TripleIndexes::new();
        idx.insert(Triple::new(1, 10, 100));
        idx.insert(Triple::new(1, 10, 101));
        idx.insert(Triple::new(1, 11, 100));
        idx.insert(Triple::new(2, 10, 100));
        idx
    }

    #[test]
    fn find_fully_bound() {
        let idx = sample();
        assert_eq!(idx.find(Some(1), Some(10), Some(100)).len(), 1);
        assert_eq!(idx.find(Some(1), Some(10), Some(999)).len(), 0);
    }

    #[test]
    fn find_by_subject_only() {
        let idx = sample();
        assert_eq!(idx.find(Some(1), None, None).len(), 3);
    }

    #[test]
    fn find_by_predicate_only() {
        let idx = sample();
        assert_eq!(idx.find(None, Some(10), None).len(), 3);
    }

    #[test]
    fn find_by_object_only() {
        let idx = sample();
        assert_eq!(idx.find(None, None, Some(100)).len(), 3);
    }

    #[test]
    fn find_wildcard_is_full_scan() {
        let idx = sample();
        assert_eq!(idx.find(None, None, None).len(), 4);
    }

    #[test]
    fn remove_drops_from_all_three_indexes() {
        let mut idx = sample();
        idx.remove(Triple::new(1, 10, 100));
        assert!(!idx.contains(Triple::new(1, 10, 100)));
        assert_eq!(idx.find(Some(1), None, None).len(), 2);
        assert_eq!(idx.find(None, Some(10), None).len(), 2);
        assert_eq!(idx.find(None, None, Some(100)).len(), 2);
    }

    #[test]
    fn clear_empties_all_indexes() {
        let mut idx = sample();
        idx.clear();
        assert_eq!(idx.find(None, None, None).len(), 0);
    }
}
