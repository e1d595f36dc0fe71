//! The active, writable block of an in-memory store.
//!
//! A mutable block maps trace ids to traces and keeps two indexes up to
//! date on every append: known services, and known operation names per
//! service. It guards its contents with its own reader/writer lock so that
//! appends and reads serialize here rather than on the store's lock.

use super::{merge, ReadStore, SpanStore};
use crate::core::{Query, Result, Span, Trace, TraceId};
use ahash::{AHashMap, AHashSet};
use parking_lot::RwLock;

/// Contents of a block. Moved out wholesale when the block is frozen.
#[derive(Debug, Default)]
pub(crate) struct BlockData {
    pub(crate) traces: AHashMap<TraceId, Trace>,
    pub(crate) services: AHashSet<String>,
    pub(crate) span_names: AHashMap<String, AHashSet<String>>,
}

/// Single append target of a store.
#[derive(Debug)]
pub struct MutableBlock {
    capacity: usize,
    data: RwLock<BlockData>,
}

impl MutableBlock {
    /// Create an empty block that reports full at `capacity` distinct traces.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            data: RwLock::new(BlockData {
                traces: AHashMap::with_capacity(capacity),
                ..BlockData::default()
            }),
        }
    }

    /// True once the block holds `capacity` distinct traces.
    ///
    /// Appends racing past this check may push the block marginally over
    /// capacity.
    pub fn is_full(&self) -> bool {
        self.data.read().traces.len() >= self.capacity
    }

    /// Configured trace capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of distinct traces held
    pub fn len(&self) -> usize {
        self.data.read().traces.len()
    }

    /// Returns true if no traces are held
    pub fn is_empty(&self) -> bool {
        self.data.read().traces.is_empty()
    }

    pub(crate) fn into_data(self) -> BlockData {
        self.data.into_inner()
    }
}

impl SpanStore for MutableBlock {
    fn append(&self, span: Span) -> Result<()> {
        let mut data = self.data.write();
        let BlockData {
            traces,
            services,
            span_names,
        } = &mut *data;

        for service in span.service_names() {
            if !services.contains(service) {
                services.insert(service.to_owned());
            }
            let names = span_names.entry(service.to_owned()).or_default();
            if !names.contains(&span.name) {
                names.insert(span.name.clone());
            }
        }

        let trace_id = span.trace_id;
        traces
            .entry(trace_id)
            .or_insert_with(|| Trace::new(trace_id))
            .push(span);

        Ok(())
    }
}

impl ReadStore for MutableBlock {
    fn services(&self) -> Result<Vec<String>> {
        Ok(self.data.read().services.iter().cloned().collect())
    }

    fn span_names(&self, service: &str) -> Result<Vec<String>> {
        Ok(self
            .data
            .read()
            .span_names
            .get(service)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn trace(&self, id: TraceId) -> Result<Trace> {
        Ok(self.data.read().traces.get(&id).cloned().unwrap_or_default())
    }

    fn traces(&self, query: &Query) -> Result<Vec<Trace>> {
        let data = self.data.read();
        let mut matches: Vec<&Trace> = data
            .traces
            .values()
            .filter(|trace| trace.matches(query))
            .collect();
        matches.sort_by(|a, b| merge::by_min_timestamp(a, b));
        query.truncate(&mut matches);
        Ok(matches.into_iter().cloned().collect())
    }
}
