//! Common test utilities and fixtures.
#![allow(dead_code)]

use spanstore::core::{Annotation, BinaryAnnotation, Endpoint, Span, StoreConfig, Trace};
use spanstore::storage::{InMemoryStore, SpanStore};

/// Test fixture builder for creating spans with sensible defaults.
pub struct TestSpanBuilder {
    trace: i64,
    span: i64,
    timestamp: i64,
    name: String,
    services: Vec<String>,
    tags: Vec<(String, String)>,
}

impl TestSpanBuilder {
    pub fn new(trace: i64, span: i64) -> Self {
        Self {
            trace,
            span,
            timestamp: trace * 1_000 + span,
            name: format!("operation-{}", span),
            services: vec!["test-service".to_string()],
            tags: Vec::new(),
        }
    }

    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Replace the recording services; each gets its own annotation.
    pub fn services(mut self, services: &[&str]) -> Self {
        self.services = services.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.tags.push((key.to_string(), value.to_string()));
        self
    }

    pub fn build(self) -> Span {
        let mut builder = Span::builder()
            .trace_id(self.trace)
            .id(self.span)
            .name(self.name)
            .timestamp(self.timestamp)
            .duration(100);
        if self.span != 0 {
            builder = builder.parent_id(0);
        }
        for service in &self.services {
            builder = builder.annotation(
                Annotation::new(self.timestamp, "sr").with_host(Endpoint::new(service.as_str())),
            );
        }
        for (key, value) in self.tags {
            builder = builder.binary_annotation(BinaryAnnotation::new(key, value));
        }
        builder.build().unwrap()
    }
}

/// Store with explicit block sizing.
pub fn store(block_capacity: usize, max_immutable_blocks: usize) -> InMemoryStore {
    InMemoryStore::with_config(StoreConfig {
        block_capacity,
        max_immutable_blocks,
    })
    .unwrap()
}

/// Append one single-span trace per id, timestamped by id.
pub fn append_traces(store: &InMemoryStore, ids: std::ops::Range<i64>) {
    for id in ids {
        store.append(TestSpanBuilder::new(id, 0).build()).unwrap();
    }
}

/// Verify traces are sorted by minimum timestamp (oldest first).
pub fn assert_sorted_by_min_timestamp(traces: &[Trace]) {
    for pair in traces.windows(2) {
        assert!(
            pair[0].min_timestamp <= pair[1].min_timestamp,
            "Traces not sorted by min timestamp"
        );
    }
}

/// Verify spans within a trace are sorted by timestamp.
pub fn assert_spans_sorted(trace: &Trace) {
    for pair in trace.spans.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp, "Spans not sorted by timestamp");
    }
}
