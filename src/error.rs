/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Error taxonomy shared by the parser, planner, executor, and streaming layers.

use thiserror::Error;

/// Failures that can occur while recognizing a SPARQL SELECT query.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unsupported query type: only SELECT is recognized")]
    UnsupportedQueryType,

    #[error("missing WHERE clause")]
    MissingWhere,

    #[error("unbalanced parentheses in FILTER expression: {0}")]
    UnbalancedFilter(String),

    #[error("could not parse query at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },
}

/// Reserved for a future persistent store; the in-memory [`crate::store::TripleStore`]
/// has no fallible path today, but callers that may later sit on top of a
/// disk-backed store can match on this type without a breaking change.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store operation failed: {0}")]
    Backend(String),
}

/// Failures surfaced by [`crate::executor::Executor`] and
/// [`crate::streaming::StreamingExecutor`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("internal invariant violation: {0}")]
    Internal(String),
}
