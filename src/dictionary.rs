/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! String interning for triple terms. The store works exclusively in `u32`
//! ids internally; callers only ever see strings.

use rustc_hash::FxHashMap;

#[derive(Debug, Default)]
pub struct Dictionary {
    string_to_id: FxHashMap<String, u32>,
    id_to_string: FxHashMap<u32, String>,
    next_id: u32,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `s`, returning its id. Repeated calls with the same string
    /// return the same id.
    pub fn encode(&mut self, s: &str) -> u32 {
        if let Some(&id) = self.string_to_id.get(s) {
            return id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.string_to_id.insert(s.to_string(), id);
        self.id_to_string.insert(id, s.to_string());
        id
    }

    /// Looks up an already-interned id without creating a new entry.
    pub fn lookup(&self, s: &str) -> Option<u32> {
        self.string_to_id.get(s).copied()
    }

    pub fn decode(&self, id: u32) -> Option<&str> {
        self.id_to_string.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.id_to_string.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_string.is_empty()
    }

    pub fn clear(&mut self) {
        self.string_to_id.clear();
        self.id_to_string.clear();
        self.next_id = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_is_idempotent() {
        let mut dict = Dictionary::new();
        let a = dict.encode("main.go");
        let b = dict.encode("main.go");
        assert_eq!(a, b);
        assert_eq!(dict.decode(a), Some("main.go"));
    }

    #[test]
    fn distinct_strings_get_distinct_ids() {
        let mut dict = Dictionary::new();
        let a = dict.encode("main.go");
        let b = dict.encode("utils.go");
        assert_ne!(a, b);
    }

    #[test]
    fn lookup_does_not_insert() {
        let mut dict = Dictionary::new();
        assert_eq!(dict.lookup("missing"), None);
        assert_eq!(dict.len(), 0);
        dict.encode("present");
        assert_eq!(dict.lookup("present"), Some(0));
    }

    #[test]
    fn clear_resets_ids() {
        let mut dict = Dictionary::new();
        dict.encode("a");
        dict.encode("b");
        dict.clear();
        assert!(dict.is_empty());
        let id = dict.encode("a");
        assert_eq!(id, 0);
    }
}
