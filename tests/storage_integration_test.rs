//! Integration tests for the block-partitioned store: rotation, eviction and
//! merging of partial results across blocks.

mod common;

use common::{append_traces, assert_sorted_by_min_timestamp, assert_spans_sorted, store, TestSpanBuilder};
use pretty_assertions::assert_eq;
use spanstore::core::{Annotation, BinaryAnnotation, Endpoint, Query, Span, TraceId};
use spanstore::storage::{InMemoryStore, ReadStore, SpanStore};

#[test]
fn test_single_trace_spans_sorted_with_true_minimum() {
    let store = InMemoryStore::new();
    // 1024 distinct timestamps in scrambled order
    let timestamps: Vec<i64> = (0..1024).map(|i| 500 + (i * 7919) % 1024).collect();
    for (span, ts) in timestamps.iter().enumerate() {
        store
            .append(TestSpanBuilder::new(77, span as i64 + 1).timestamp(*ts).build())
            .unwrap();
    }

    let trace = store.trace(TraceId(77)).unwrap();
    assert_eq!(trace.span_count(), 1024);
    assert_spans_sorted(&trace);
    assert_eq!(trace.min_timestamp, *timestamps.iter().min().unwrap());
    assert_eq!(trace.min_timestamp, 500);
    assert_eq!(store.stats().rotations, 0);
}

#[test]
fn test_distinct_trace_past_capacity_rotates_once() {
    let store = InMemoryStore::new();
    append_traces(&store, 0..1024);
    let stats = store.stats();
    assert_eq!(stats.rotations, 0);
    assert_eq!(stats.mutable_traces, 1024);

    append_traces(&store, 1024..1025);
    let stats = store.stats();
    assert_eq!(stats.rotations, 1);
    assert_eq!(stats.immutable_blocks, 1);
    assert_eq!(stats.mutable_traces, 1);

    // the frozen block is still readable
    assert_eq!(store.trace(TraceId(0)).unwrap().span_count(), 1);
    assert_eq!(store.traces(&Query::default()).unwrap().len(), 1025);

    // a span for a frozen trace lands in the new block, not the old one
    store.append(TestSpanBuilder::new(0, 1).build()).unwrap();
    assert_eq!(store.stats().mutable_traces, 2);
    assert_eq!(store.trace(TraceId(0)).unwrap().span_count(), 2);
}

#[test]
fn test_oldest_block_evicted_after_retention_exceeded() {
    let store = store(1, 1024);
    let oldest = TestSpanBuilder::new(0, 5)
        .services(&["retired-service"])
        .name("retired-op")
        .build();
    store.append(oldest).unwrap();
    // 1024 rotations fill the retained sequence exactly
    append_traces(&store, 1..1025);
    assert_eq!(store.stats().rotations, 1024);
    assert_eq!(store.stats().evictions, 0);
    assert!(!store.trace(TraceId(0)).unwrap().is_empty());
    assert_eq!(store.span_names("retired-service").unwrap(), vec!["retired-op"]);

    // one more rotation pushes the oldest block out
    append_traces(&store, 1025..1026);
    let stats = store.stats();
    assert_eq!(stats.rotations, 1025);
    assert_eq!(stats.evictions, 1);
    assert_eq!(stats.immutable_blocks, 1024);

    assert!(store.trace(TraceId(0)).unwrap().is_empty());
    assert!(!store.services().unwrap().contains(&"retired-service".to_string()));
    assert!(store.span_names("retired-service").unwrap().is_empty());
    let traces = store.traces(&Query::default()).unwrap();
    assert!(traces.iter().all(|t| t.trace_id != TraceId(0)));
    assert_eq!(traces.len(), 1025);
}

#[test]
fn test_services_reported_once() {
    let store = store(2, 16);
    let span = Span::builder()
        .trace_id(1)
        .name("checkout")
        .timestamp(10)
        .annotation(Annotation::new(10, "cs").with_host(Endpoint::new("web")))
        .annotation(Annotation::new(11, "sr").with_host(Endpoint::new("cart")))
        .annotation(Annotation::new(19, "ss").with_host(Endpoint::new("cart")))
        .annotation(Annotation::new(20, "cr").with_host(Endpoint::new("web")))
        .binary_annotation(BinaryAnnotation::new("http.path", "/cart").with_host(Endpoint::new("web")))
        .build()
        .unwrap();
    store.append(span).unwrap();
    for trace in 2..7 {
        store
            .append(TestSpanBuilder::new(trace, 0).services(&["web", "cart"]).build())
            .unwrap();
    }
    assert!(store.stats().immutable_blocks >= 2);

    assert_eq!(store.services().unwrap(), vec!["cart", "web"]);
    assert_eq!(store.span_names("cart").unwrap(), vec!["checkout", "operation-0"]);
}

#[test]
fn test_trace_split_across_rotation_reassembled() {
    let store = store(2, 8);
    store.append(TestSpanBuilder::new(1, 1).timestamp(300).build()).unwrap();
    store.append(TestSpanBuilder::new(1, 2).timestamp(100).build()).unwrap();
    store.append(TestSpanBuilder::new(2, 0).timestamp(150).build()).unwrap();
    // block full: the rest of trace 1 goes to the next block
    store.append(TestSpanBuilder::new(1, 3).timestamp(50).build()).unwrap();
    store.append(TestSpanBuilder::new(1, 4).timestamp(400).build()).unwrap();
    assert_eq!(store.stats().rotations, 1);

    let trace = store.trace(TraceId(1)).unwrap();
    let ids: Vec<_> = trace.spans.iter().map(|s| s.id.0).collect();
    assert_eq!(ids, vec![3, 2, 1, 4]);
    assert_eq!(trace.min_timestamp, 50);
    assert_eq!(trace.trace_id, TraceId(1));

    // the search path merges the same way
    let traces = store.traces(&Query::default()).unwrap();
    assert_eq!(traces.len(), 2);
    assert_eq!(traces[0].trace_id, TraceId(1));
    assert_eq!(traces[0].span_count(), 4);
    assert_eq!(traces[0].min_timestamp, 50);
    assert_sorted_by_min_timestamp(&traces);
}

#[test]
fn test_traces_limit_across_two_blocks() {
    let store = store(5, 8);
    append_traces(&store, 0..10);
    assert_eq!(store.stats().immutable_blocks, 1);

    let traces = store.traces(&Query::with_limit(3)).unwrap();
    let ids: Vec<_> = traces.iter().map(|t| t.trace_id.get()).collect();
    assert_eq!(ids, vec![7, 8, 9]);

    let unbounded = store.traces(&Query::with_limit(0)).unwrap();
    assert_eq!(unbounded.len(), 10);
    assert_sorted_by_min_timestamp(&unbounded);
}

#[test]
fn test_per_block_limit_ranks_split_trace_by_surviving_partial() {
    let store = store(3, 8);
    store.append(TestSpanBuilder::new(10, 0).timestamp(10).build()).unwrap();
    store.append(TestSpanBuilder::new(20, 0).timestamp(20).build()).unwrap();
    store.append(TestSpanBuilder::new(99, 1).timestamp(5).build()).unwrap();
    // rotation: second half of trace 99 and a newer trace land in block two
    store.append(TestSpanBuilder::new(99, 2).timestamp(50).build()).unwrap();
    store.append(TestSpanBuilder::new(30, 0).timestamp(30).build()).unwrap();

    // Exact answer would be trace 30 (trace 99 really starts at 5). Each
    // block truncates first, so only the late partial of 99 is ranked.
    let traces = store.traces(&Query::with_limit(1)).unwrap();
    assert_eq!(traces.len(), 1);
    assert_eq!(traces[0].trace_id, TraceId(99));
    assert_eq!(traces[0].span_count(), 1);
    assert_eq!(traces[0].min_timestamp, 50);

    // Trace lookups always see every partial.
    assert_eq!(store.trace(TraceId(99)).unwrap().min_timestamp, 5);
}

#[test]
fn test_unknown_lookups_are_empty_not_errors() {
    let store = store(2, 2);
    append_traces(&store, 0..5);
    assert!(store.span_names("unknown-service").unwrap().is_empty());
    assert!(store.trace(TraceId(12345)).unwrap().is_empty());
    let query = Query::builder().service_name("unknown-service").build().unwrap();
    assert!(store.traces(&query).unwrap().is_empty());
}

#[test]
fn test_filtered_search_across_blocks() {
    let store = store(2, 8);
    for trace in 0..8 {
        let service = if trace % 2 == 0 { "even" } else { "odd" };
        store
            .append(
                TestSpanBuilder::new(trace, 0)
                    .services(&[service])
                    .tag("parity", service)
                    .build(),
            )
            .unwrap();
    }

    let query = Query::builder().service_name("odd").limit(2).build().unwrap();
    let ids: Vec<_> = store
        .traces(&query)
        .unwrap()
        .iter()
        .map(|t| t.trace_id.get())
        .collect();
    assert_eq!(ids, vec![5, 7]);

    let query = Query::builder().binary_annotation("parity", "even").build().unwrap();
    let ids: Vec<_> = store
        .traces(&query)
        .unwrap()
        .iter()
        .map(|t| t.trace_id.get())
        .collect();
    assert_eq!(ids, vec![0, 2, 4, 6]);

    let query = Query::builder().end_ts(3_000).lookback(1_000).build().unwrap();
    let ids: Vec<_> = store
        .traces(&query)
        .unwrap()
        .iter()
        .map(|t| t.trace_id.get())
        .collect();
    assert_eq!(ids, vec![2, 3]);
}

#[test]
fn test_independent_stores_do_not_interfere() {
    let first = store(4, 4);
    let second = store(4, 4);
    append_traces(&first, 0..3);
    assert!(second.services().unwrap().is_empty());
    assert_eq!(second.stats().spans_appended, 0);
    assert_eq!(first.stats().spans_appended, 3);
}
