/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! An in-process knowledge-graph engine for source-code metadata.
//!
//! Triples flow in through [`store::TripleStore`]; a restricted SPARQL
//! `SELECT` dialect ([`parser`]) is reordered by [`planner`] and answered by
//! [`executor::Executor`], either all at once or chunked through
//! [`streaming::StreamingExecutor`].

pub mod ast;
pub mod dictionary;
pub mod error;
pub mod executor;
pub mod index;
pub mod parser;
pub mod planner;
pub mod stats;
pub mod store;
pub mod streaming;
pub mod term;
pub mod triple;

pub use ast::SelectQuery;
pub use error::{ExecutionError, ParseError, StoreError};
pub use executor::{Executor, ExecutorConfig, QueryResult};
pub use store::TripleStore;
pub use streaming::{PagedResult, ProgressCallback, ResultStream, StreamingConfig, StreamingExecutor};
pub use term::Term;
