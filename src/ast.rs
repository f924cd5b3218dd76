/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Typed representation of a parsed SELECT query.

use std::collections::HashMap;

use crate::term::Term;

/// A triple pattern: any position may be a variable.
pub type TriplePattern = (Term, Term, Term);

/// The projection a query asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    All,
    Variables(Vec<String>),
}

impl Default for Projection {
    fn default() -> Self {
        Projection::Variables(Vec::new())
    }
}

/// A single supported filter form. `Unsupported` carries the raw text of a
/// filter expression this parser recognized syntactically but could not
/// classify; it always evaluates to true at execution time (see
/// [`crate::executor`]), with a diagnostic emitted at the point of use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpr {
    Regex { variable: String, pattern: String },
    Contains { variable: String, needle: String },
    Eq { variable: String, value: String },
    NotEq { variable: String, value: String },
    Unsupported(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub variable: String,
    pub direction: SortDirection,
}

/// A fully parsed `SELECT` query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectQuery {
    pub prefixes: HashMap<String, String>,
    pub distinct: bool,
    pub projection: Projection,
    pub where_clause: Vec<TriplePattern>,
    pub filters: Vec<FilterExpr>,
    pub order_by: Option<OrderBy>,
    pub limit: u64,
    pub offset: u64,
}
