/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Term representation shared by the AST and the executor.

use std::fmt;

/// A single SPARQL term as it appears in parsed query text, before any
/// dictionary interning or bracket canonicalization happens.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// `?name`, stored without the leading sigil.
    Variable(String),
    /// `<uri>`, stored without the angle brackets.
    Uri(String),
    /// `"literal"`, stored without the quotes.
    Literal(String),
}

impl Term {
    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }

    pub fn variable_name(&self) -> Option<&str> {
        match self {
            Term::Variable(name) => Some(name),
            _ => None,
        }
    }

    /// The raw text this term carries, regardless of kind.
    pub fn text(&self) -> &str {
        match self {
            Term::Variable(s) | Term::Uri(s) | Term::Literal(s) => s,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Variable(name) => write!(f, "?{name}"),
            Term::Uri(uri) => write!(f, "<{uri}>"),
            Term::Literal(lit) => write!(f, "\"{lit}\""),
        }
    }
}
