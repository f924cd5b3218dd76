/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Joins a query's `WHERE` patterns against a [`TripleStore`] via nested-loop
//! binding expansion, then applies filters, ordering, offset/limit,
//! distinct, and projection in that order.

use std::collections::{BTreeMap, BTreeSet};

use log::warn;
use regex::Regex;

use crate::ast::{FilterExpr, Projection, SelectQuery};
use crate::error::ExecutionError;
use crate::parser::parse_select_query;
use crate::planner::plan;
use crate::store::TripleStore;
use crate::term::Term;

/// A single row of the result: variable name -> bound term text.
pub type Binding = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryResult {
    pub variables: Vec<String>,
    pub bindings: Vec<Binding>,
}

impl QueryResult {
    pub fn count(&self) -> usize {
        self.bindings.len()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExecutorConfig {
    /// Whether the planner is allowed to reorder `WHERE` patterns before
    /// joining. Purely a performance knob; result sets are identical either
    /// way (property 4).
    pub enable_planning: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            enable_planning: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Executor {
    store: TripleStore,
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(store: TripleStore) -> Self {
        Executor {
            store,
            config: ExecutorConfig::default(),
        }
    }

    pub fn with_config(store: TripleStore, config: ExecutorConfig) -> Self {
        Executor { store, config }
    }

    pub fn store(&self) -> &TripleStore {
        &self.store
    }

    pub fn execute_string(&self, text: &str) -> Result<QueryResult, ExecutionError> {
        let ast = parse_select_query(text)?;
        self.execute(&ast)
    }

    pub fn execute(&self, ast: &SelectQuery) -> Result<QueryResult, ExecutionError> {
        let ast = if self.config.enable_planning {
            plan(ast, &self.store)
        } else {
            ast.clone()
        };

        let joined = self.join(&ast);
        let filtered: Vec<Binding> = joined
            .into_iter()
            .filter(|b| self.passes_filters(b, &ast.filters))
            .collect();

        let ordered = apply_order_by(filtered, &ast);
        let distinct = if ast.distinct {
            apply_distinct(ordered, &ast.projection)
        } else {
            ordered
        };
        let paged = apply_offset_limit(distinct, ast.offset, ast.limit);
        let variables = projected_variables(&ast.projection, &paged);

        Ok(QueryResult {
            variables,
            bindings: paged,
        })
    }

    /// Nested-loop join: starts from a single empty binding and extends it
    /// pattern by pattern. A repeated variable within one pattern must
    /// unify — candidate triples where the two occurrences disagree are
    /// dropped rather than overwriting the earlier binding.
    fn join(&self, ast: &SelectQuery) -> Vec<Binding> {
        let mut bindings: Vec<Binding> = vec![Binding::new()];

        for pattern in &ast.where_clause {
            let mut next = Vec::new();
            for binding in &bindings {
                let (s, p, o) = resolve_pattern(pattern, binding);
                let matches = self.store.find(&s, &p, &o);
                for t in matches {
                    let mut candidate = binding.clone();
                    if extend_binding(&mut candidate, &pattern.0, &t.subject)
                        && extend_binding(&mut candidate, &pattern.1, &t.predicate)
                        && extend_binding(&mut candidate, &pattern.2, &t.object)
                    {
                        next.push(candidate);
                    }
                }
            }
            bindings = next;
            if bindings.is_empty() {
                break;
            }
        }

        bindings
    }

    fn passes_filters(&self, binding: &Binding, filters: &[FilterExpr]) -> bool {
        filters.iter().all(|f| evaluate_filter(f, binding))
    }
}

/// Canonicalizes a term for a store lookup: variables resolve through the
/// current binding (unbound variables become the wildcard), literals pass
/// through untouched, and URIs have their brackets stripped unless they are
/// a local reference (`#...`, `./...`, `../...`).
fn resolve_term(term: &Term, binding: &Binding) -> String {
    match term {
        Term::Variable(name) => binding.get(name).cloned().unwrap_or_default(),
        Term::Literal(lit) => lit.clone(),
        Term::Uri(uri) => canonicalize_uri(uri),
    }
}

fn canonicalize_uri(uri: &str) -> String {
    if uri.starts_with('#') || uri.starts_with("./") || uri.starts_with("../") {
        format!("<{uri}>")
    } else {
        uri.to_string()
    }
}

fn resolve_pattern(pattern: &crate::ast::TriplePattern, binding: &Binding) -> (String, String, String) {
    (
        resolve_term(&pattern.0, binding),
        resolve_term(&pattern.1, binding),
        resolve_term(&pattern.2, binding),
    )
}

/// Extends `binding` with `term`'s value if `term` is a variable. Returns
/// `false` if the variable was already bound to a different value, meaning
/// this pattern's repeated-variable occurrences disagree and the candidate
/// triple must be dropped.
fn extend_binding(binding: &mut Binding, term: &Term, value: &str) -> bool {
    if let Term::Variable(name) = term {
        match binding.get(name) {
            Some(existing) if existing != value => return false,
            Some(_) => {}
            None => {
                binding.insert(name.clone(), value.to_string());
            }
        }
    }
    true
}

fn evaluate_filter(filter: &FilterExpr, binding: &Binding) -> bool {
    match filter {
        FilterExpr::Regex { variable, pattern } => {
            let value = binding.get(variable).map(String::as_str).unwrap_or_default();
            match Regex::new(pattern) {
                Ok(re) => re.is_match(value),
                Err(e) => {
                    warn!("filter: invalid regex {pattern:?}: {e}");
                    true
                }
            }
        }
        FilterExpr::Contains { variable, needle } => binding
            .get(variable)
            .map(|v| v.contains(needle.as_str()))
            .unwrap_or(false),
        FilterExpr::Eq { variable, value } => {
            binding.get(variable).map(String::as_str) == Some(value.as_str())
        }
        FilterExpr::NotEq { variable, value } => {
            binding.get(variable).map(String::as_str) != Some(value.as_str())
        }
        FilterExpr::Unsupported(text) => {
            warn!("filter: unrecognized FILTER form {text:?}, passing through as true");
            true
        }
    }
}

fn apply_order_by(mut bindings: Vec<Binding>, ast: &SelectQuery) -> Vec<Binding> {
    if let Some(order) = &ast.order_by {
        bindings.sort_by(|a, b| {
            let av = a.get(&order.variable).map(String::as_str).unwrap_or("");
            let bv = b.get(&order.variable).map(String::as_str).unwrap_or("");
            match order.direction {
                crate::ast::SortDirection::Ascending => av.cmp(bv),
                crate::ast::SortDirection::Descending => bv.cmp(av),
            }
        });
    }
    bindings
}

/// Collapses bindings that agree on every projected variable (or, for `*`,
/// on every variable present). Applied before offset/limit so pagination
/// operates on the de-duplicated set.
fn apply_distinct(bindings: Vec<Binding>, projection: &Projection) -> Vec<Binding> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(bindings.len());
    for binding in bindings {
        let key = distinct_key(&binding, projection);
        if seen.insert(key) {
            out.push(binding);
        }
    }
    out
}

fn distinct_key(binding: &Binding, projection: &Projection) -> Vec<(String, String)> {
    match projection {
        Projection::All => binding.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        Projection::Variables(vars) => vars
            .iter()
            .map(|v| (v.clone(), binding.get(v).cloned().unwrap_or_default()))
            .collect(),
    }
}

fn apply_offset_limit(bindings: Vec<Binding>, offset: u64, limit: u64) -> Vec<Binding> {
    let offset = offset as usize;
    let skipped: Vec<Binding> = bindings.into_iter().skip(offset).collect();
    if limit == 0 {
        skipped
    } else {
        skipped.into_iter().take(limit as usize).collect()
    }
}

fn projected_variables(projection: &Projection, bindings: &[Binding]) -> Vec<String> {
    match projection {
        Projection::Variables(vars) => vars.clone(),
        Projection::All => {
            let mut set = BTreeSet::new();
            for binding in bindings {
                for key in binding.keys() {
                    set.insert(key.clone());
                }
            }
            set.into_iter().collect()
        }
    }
}
