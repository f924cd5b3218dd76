/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use codegraph_kg::{Executor, StreamingExecutor, TripleStore};

fn setup_test_store() -> TripleStore {
    let store = TripleStore::new();
    store.bulk_add(&[
        ("main.go", "linksTo", "utils.go"),
        ("main.go", "exports", "main"),
        ("utils.go", "exports", "helper"),
        ("main.go", "language", "go"),
        ("utils.go", "language", "go"),
    ]);
    store
}

#[test]
fn query_across_store_parser_planner_and_executor() {
    let store = setup_test_store();
    let executor = Executor::new(store);

    let result = executor
        .execute_string(
            r#"PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>
SELECT ?s WHERE { ?s <language> "go" . ?s <exports> ?o }"#,
        )
        .unwrap();

    assert_eq!(result.count(), 2);
}

#[test]
fn a_shortcut_round_trips_through_the_full_pipeline() {
    let store = TripleStore::new();
    store.add("main.go", "http://www.w3.org/1999/02/22-rdf-syntax-ns#type", "Module");

    let executor = Executor::new(store);
    let result = executor
        .execute_string("SELECT ?s WHERE { ?s a <Module> }")
        .unwrap();

    assert_eq!(result.count(), 1);
}

#[test]
fn pagination_end_to_end_never_drops_or_duplicates_a_binding() {
    let store = TripleStore::new();
    for i in 0..37 {
        store.add(&format!("m{i:02}"), "imports", "dep");
    }
    let streamer = StreamingExecutor::new(Executor::new(store));

    let mut collected = Vec::new();
    let mut page = 1;
    loop {
        let paged = streamer
            .execute_string_paginated("SELECT ?s WHERE { ?s <imports> ?o } ORDER BY ?s", page, 9)
            .unwrap();
        collected.extend(paged.bindings.iter().map(|b| b["s"].clone()));
        if !paged.has_more {
            break;
        }
        page += 1;
    }

    let mut expected: Vec<String> = (0..37).map(|i| format!("m{i:02}")).collect();
    expected.sort();
    assert_eq!(collected, expected);
}

#[test]
fn streaming_and_direct_execution_agree_on_result_set() {
    let store = setup_test_store();
    let direct = Executor::new(store.clone())
        .execute_string("SELECT ?s ?o WHERE { ?s <exports> ?o }")
        .unwrap();
    let streamed = StreamingExecutor::new(Executor::new(store))
        .execute_string_stream("SELECT ?s ?o WHERE { ?s <exports> ?o }")
        .unwrap()
        .collect();

    assert_eq!(direct.bindings.len(), streamed.len());
}

#[test]
fn empty_store_produces_empty_results_not_errors() {
    let executor = Executor::new(TripleStore::new());
    let result = executor
        .execute_string("SELECT ?s WHERE { ?s <anything> ?o }")
        .unwrap();
    assert_eq!(result.count(), 0);
}

#[test]
fn malformed_query_surfaces_a_parse_error_not_a_panic() {
    let executor = Executor::new(TripleStore::new());
    let err = executor.execute_string("SELECT ?s").unwrap_err();
    assert!(matches!(
        err,
        codegraph_kg::ExecutionError::Parse(codegraph_kg::ParseError::MissingWhere)
    ));
}
