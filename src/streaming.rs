/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Chunked delivery of an already-computed [`QueryResult`] over a bounded
//! channel, plus page-at-a-time pagination. The executor still materializes
//! the full result before streaming begins; "streaming" here means
//! backpressured, cancellable delivery of that materialized set, not an
//! incremental join.

use std::fmt;
use std::sync::Arc;
use std::thread;

use crossbeam::channel::{bounded, Receiver, Sender};
use log::{debug, trace};

use crate::ast::SelectQuery;
use crate::error::ExecutionError;
use crate::executor::{Binding, Executor};

/// A caller-supplied `(current, total)` progress callback, invoked once per
/// emitted binding while [`StreamingConfig::report_progress`] is set.
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

#[derive(Clone)]
pub struct StreamingConfig {
    pub page_size: usize,
    pub buffer_size: usize,
    pub report_progress: bool,
    pub on_progress: Option<ProgressCallback>,
}

impl fmt::Debug for StreamingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingConfig")
            .field("page_size", &self.page_size)
            .field("buffer_size", &self.buffer_size)
            .field("report_progress", &self.report_progress)
            .field(
                "on_progress",
                &self.on_progress.as_ref().map(|_| "Fn(usize, usize)"),
            )
            .finish()
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        StreamingConfig {
            page_size: 100,
            buffer_size: 100,
            report_progress: false,
            on_progress: None,
        }
    }
}

/// A page of bindings plus the totals needed to drive further pagination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagedResult {
    pub variables: Vec<String>,
    pub bindings: Vec<Binding>,
    pub page: u64,
    pub page_size: u64,
    pub total_count: u64,
    pub total_pages: u64,
    pub has_more: bool,
}

/// A producer/consumer pair carrying bindings, an early failure, and a
/// cancellation signal. Dropping `done` (or sending on it) lets the
/// in-flight producer observe the closure and stop, so no thread is ever
/// left running past the point the consumer walks away.
///
/// `errors` stays empty-and-closed in the current implementation: the query
/// is fully executed, and any parse or execution failure surfaced, before a
/// `ResultStream` is ever handed back, so the producer thread itself never
/// fails. The channel is kept in the public contract so a future producer
/// that streams an incremental join (see the module-level doc comment)
/// can report a mid-stream failure without a breaking change.
pub struct ResultStream {
    pub variables: Vec<String>,
    pub results: Receiver<Binding>,
    pub errors: Receiver<ExecutionError>,
    pub done: Sender<()>,
    producer: Option<thread::JoinHandle<()>>,
}

impl ResultStream {
    /// Blocks until every binding is produced or the stream is cancelled.
    pub fn collect(&self) -> Vec<Binding> {
        self.results.iter().collect()
    }

    /// Drains at most `n` bindings.
    pub fn collect_page(&self, n: usize) -> Vec<Binding> {
        self.results.iter().take(n).collect()
    }

    /// Invokes `f` once per binding, in emission order, stopping at the
    /// first error `f` returns.
    pub fn for_each<E>(&self, mut f: impl FnMut(Binding) -> Result<(), E>) -> Result<(), E> {
        for binding in self.results.iter() {
            f(binding)?;
        }
        Ok(())
    }

    /// Signals the producer to stop without waiting for it to drain.
    pub fn cancel(&self) {
        let _ = self.done.send(());
    }
}

impl Drop for ResultStream {
    fn drop(&mut self) {
        self.cancel();
        if let Some(handle) = self.producer.take() {
            let _ = handle.join();
        }
    }
}

#[derive(Debug, Clone)]
pub struct StreamingExecutor {
    executor: Executor,
    config: StreamingConfig,
}

impl StreamingExecutor {
    pub fn new(executor: Executor) -> Self {
        StreamingExecutor {
            executor,
            config: StreamingConfig::default(),
        }
    }

    pub fn with_config(executor: Executor, config: StreamingConfig) -> Self {
        StreamingExecutor { executor, config }
    }

    pub fn execute_string_stream(&self, text: &str) -> Result<ResultStream, ExecutionError> {
        let ast = crate::parser::parse_select_query(text)?;
        self.execute_stream(&ast)
    }

    /// Executes `ast` to completion, then spawns a producer thread that
    /// drips the resulting bindings onto a bounded channel. The producer
    /// races every send against the `done` channel closing so a consumer
    /// that stops reading early never leaves it blocked forever.
    pub fn execute_stream(&self, ast: &SelectQuery) -> Result<ResultStream, ExecutionError> {
        let result = self.executor.execute(ast)?;
        let variables = result.variables.clone();
        let total = result.bindings.len();

        let (results_tx, results_rx) = bounded(self.config.buffer_size.max(1));
        let (errors_tx, errors_rx) = bounded(1);
        let (done_tx, done_rx) = bounded::<()>(0);
        let report_progress = self.config.report_progress;
        let on_progress = self.config.on_progress.clone();

        let producer = thread::spawn(move || {
            for (i, binding) in result.bindings.into_iter().enumerate() {
                crossbeam::select! {
                    send(results_tx, binding) -> res => {
                        if res.is_err() {
                            break;
                        }
                        if report_progress {
                            trace!("streaming: emitted {}/{}", i + 1, total);
                            if let Some(callback) = &on_progress {
                                callback(i + 1, total);
                            }
                        }
                    }
                    recv(done_rx) -> _ => {
                        debug!("streaming: cancelled after {i} of {total} bindings");
                        return;
                    }
                }
            }
            debug!("streaming: drained all {total} bindings");
            drop(errors_tx);
        });

        Ok(ResultStream {
            variables,
            results: results_rx,
            errors: errors_rx,
            done: done_tx,
            producer: Some(producer),
        })
    }

    pub fn execute_string_paginated(
        &self,
        text: &str,
        page: u64,
        page_size: u64,
    ) -> Result<PagedResult, ExecutionError> {
        let ast = crate::parser::parse_select_query(text)?;
        self.execute_paginated(&ast, page, page_size)
    }

    /// Runs `ast` once with limit/offset set to the requested page, and a
    /// second time with both cleared to compute `total_count`. This double
    /// execution matches the teacher's own pagination approach; a cached
    /// intermediate result would avoid the second pass but is not
    /// implemented here.
    pub fn execute_paginated(
        &self,
        ast: &SelectQuery,
        page: u64,
        page_size: u64,
    ) -> Result<PagedResult, ExecutionError> {
        let page = page.max(1);
        let page_size = page_size.max(1);

        let mut page_ast = ast.clone();
        page_ast.limit = page_size;
        page_ast.offset = (page - 1) * page_size;
        let page_result = self.executor.execute(&page_ast)?;

        let mut total_ast = ast.clone();
        total_ast.limit = 0;
        total_ast.offset = 0;
        let total_result = self.executor.execute(&total_ast)?;

        let total_count = total_result.bindings.len() as u64;
        let total_pages = total_count.div_ceil(page_size).max(1);

        Ok(PagedResult {
            variables: page_result.variables,
            bindings: page_result.bindings,
            page,
            page_size,
            total_count,
            total_pages,
            has_more: page < total_pages,
        })
    }
}
