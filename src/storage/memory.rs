//! In-memory span store built from a ring of blocks.
//!
//! All appends go to one mutable block. When it fills up it is frozen into
//! an immutable block and a fresh mutable block takes its place; the
//! immutable blocks form an oldest-first sequence that drops its head once it
//! exceeds the configured count. Reads fan out to every block and merge.
//!
//! Two lock domains are involved. The store lock is held shared by readers
//! and by the append fast path, and exclusively only while rotating. Each
//! mutable block carries its own lock for the data inside it.

use super::immutable::ImmutableBlock;
use super::mutable::MutableBlock;
use super::{merge, ReadStore, SpanStore, StoreStats};
use crate::core::{Config, Query, Result, Span, StoreConfig, Trace, TraceId};
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
struct Blocks {
    mutable: MutableBlock,
    /// Oldest first.
    immutable: VecDeque<ImmutableBlock>,
}

#[derive(Debug, Default)]
struct StoreCounters {
    spans_appended: AtomicU64,
    rotations: AtomicU64,
    evictions: AtomicU64,
}

/// Bounded, volatile span store.
///
/// Construct one per logical store; instances share no state.
#[derive(Debug)]
pub struct InMemoryStore {
    config: StoreConfig,
    blocks: RwLock<Blocks>,
    counters: StoreCounters,
}

impl InMemoryStore {
    /// Create a store with default block sizing.
    pub fn new() -> Self {
        Self::build(StoreConfig::default())
    }

    /// Create a store with explicit block sizing.
    pub fn with_config(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Create a store from application configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_config(config.storage)
    }

    fn build(config: StoreConfig) -> Self {
        Self {
            blocks: RwLock::new(Blocks {
                mutable: MutableBlock::new(config.block_capacity),
                immutable: VecDeque::with_capacity(config.max_immutable_blocks.min(1024) + 1),
            }),
            config,
            counters: StoreCounters::default(),
        }
    }

    /// Block sizing in effect
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Snapshot of counters and block occupancy.
    pub fn stats(&self) -> StoreStats {
        let blocks = self.blocks.read();
        let mutable_traces = blocks.mutable.len();
        let immutable_traces: usize = blocks.immutable.iter().map(ImmutableBlock::len).sum();
        StoreStats {
            spans_appended: self.counters.spans_appended.load(Ordering::Relaxed),
            rotations: self.counters.rotations.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            immutable_blocks: blocks.immutable.len(),
            mutable_traces,
            retained_traces: mutable_traces + immutable_traces,
            block_capacity: self.config.block_capacity,
            max_immutable_blocks: self.config.max_immutable_blocks,
        }
    }

    /// Freeze the current mutable block and install a fresh one. Returns the
    /// evicted block, if any, so the caller can drop it outside the lock.
    fn rotate(&self, blocks: &mut Blocks) -> Option<ImmutableBlock> {
        let retired = std::mem::replace(
            &mut blocks.mutable,
            MutableBlock::new(self.config.block_capacity),
        );
        let frozen = ImmutableBlock::from(retired);
        tracing::debug!(
            traces = frozen.len(),
            immutable_blocks = blocks.immutable.len() + 1,
            "Rotated mutable block"
        );
        blocks.immutable.push_back(frozen);
        self.counters.rotations.fetch_add(1, Ordering::Relaxed);

        if blocks.immutable.len() <= self.config.max_immutable_blocks {
            return None;
        }
        let evicted = blocks.immutable.pop_front()?;
        self.counters.evictions.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            traces = evicted.len(),
            time_range = ?evicted.time_range(),
            "Evicted oldest immutable block"
        );
        Some(evicted)
    }

    /// Run `f` against the mutable block and then every immutable block,
    /// oldest first, under the shared store lock.
    fn for_each_block<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&dyn ReadStore) -> Result<()>,
    {
        let blocks = self.blocks.read();
        f(&blocks.mutable)?;
        for block in &blocks.immutable {
            f(block)?;
        }
        Ok(())
    }

    fn block_count(&self) -> usize {
        self.blocks.read().immutable.len() + 1
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SpanStore for InMemoryStore {
    fn append(&self, span: Span) -> Result<()> {
        {
            let blocks = self.blocks.read();
            if !blocks.mutable.is_full() {
                blocks.mutable.append(span)?;
                self.counters.spans_appended.fetch_add(1, Ordering::Relaxed);
                return Ok(());
            }
        }

        let mut blocks = self.blocks.write();
        // Another writer may have rotated between releasing the shared lock
        // and acquiring this one.
        let evicted = if blocks.mutable.is_full() {
            self.rotate(&mut blocks)
        } else {
            tracing::trace!("Mutable block already rotated by a concurrent writer");
            None
        };
        blocks.mutable.append(span)?;
        self.counters.spans_appended.fetch_add(1, Ordering::Relaxed);
        drop(blocks);
        drop(evicted);
        Ok(())
    }
}

impl ReadStore for InMemoryStore {
    fn services(&self) -> Result<Vec<String>> {
        let mut lists = Vec::with_capacity(self.block_count());
        self.for_each_block(|block| {
            let mut services = block.services()?;
            services.sort_unstable();
            lists.push(services);
            Ok(())
        })?;
        Ok(merge::merge_string_lists(lists))
    }

    fn span_names(&self, service: &str) -> Result<Vec<String>> {
        let mut lists = Vec::with_capacity(self.block_count());
        self.for_each_block(|block| {
            let mut names = block.span_names(service)?;
            names.sort_unstable();
            lists.push(names);
            Ok(())
        })?;
        Ok(merge::merge_string_lists(lists))
    }

    fn trace(&self, id: TraceId) -> Result<Trace> {
        let mut partials = Vec::new();
        self.for_each_block(|block| {
            let partial = block.trace(id)?;
            if !partial.is_empty() {
                partials.push(partial);
            }
            Ok(())
        })?;
        Ok(merge::merge_traces(partials))
    }

    /// Each block applies `query.limit` to its own matches before the merged
    /// list is limited again. A trace split across blocks is ranked by the
    /// partials that survived each block's limit, so the result can differ
    /// from the exact most recent `limit` traces.
    fn traces(&self, query: &Query) -> Result<Vec<Trace>> {
        let mut lists = Vec::with_capacity(self.block_count());
        self.for_each_block(|block| {
            lists.push(block.traces(query)?);
            Ok(())
        })?;
        let mut traces = merge::merge_trace_lists(lists);
        query.truncate(&mut traces);
        Ok(traces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Annotation, Endpoint};
    use pretty_assertions::assert_eq;

    fn small_store(block_capacity: usize, max_immutable_blocks: usize) -> InMemoryStore {
        InMemoryStore::with_config(StoreConfig {
            block_capacity,
            max_immutable_blocks,
        })
        .unwrap()
    }

    fn span(trace: i64, id: i64, ts: i64, service: &str) -> Span {
        Span::builder()
            .trace_id(trace)
            .id(id)
            .name(format!("op-{}", trace % 3))
            .timestamp(ts)
            .annotation(Annotation::new(ts, "sr").with_host(Endpoint::new(service)))
            .build()
            .unwrap()
    }

    #[test]
    fn test_rejects_zero_sizing() {
        assert!(InMemoryStore::with_config(StoreConfig {
            block_capacity: 0,
            max_immutable_blocks: 1,
        })
        .is_err());
    }

    #[test]
    fn test_rotation_on_full_block() {
        let store = small_store(4, 8);
        for trace in 0..4 {
            store.append(span(trace, 1, trace * 10, "web")).unwrap();
        }
        assert_eq!(store.stats().rotations, 0);

        store.append(span(4, 1, 40, "web")).unwrap();
        let stats = store.stats();
        assert_eq!(stats.rotations, 1);
        assert_eq!(stats.immutable_blocks, 1);
        assert_eq!(stats.mutable_traces, 1);
        assert_eq!(stats.retained_traces, 5);

        for trace in 0..5 {
            assert!(!store.trace(TraceId(trace)).unwrap().is_empty());
        }
    }

    #[test]
    fn test_spans_for_known_trace_rotate_when_full() {
        let store = small_store(2, 4);
        store.append(span(1, 1, 10, "web")).unwrap();
        store.append(span(2, 1, 20, "web")).unwrap();
        // block is full; even a span for trace 1 goes to a new block
        store.append(span(1, 2, 5, "db")).unwrap();
        assert_eq!(store.stats().rotations, 1);

        let trace = store.trace(TraceId(1)).unwrap();
        assert_eq!(trace.span_count(), 2);
        assert_eq!(trace.min_timestamp, 5);
        assert_eq!(trace.spans[0].id.0, 2);
    }

    #[test]
    fn test_eviction_drops_oldest_block() {
        let store = small_store(1, 2);
        for trace in 0..4 {
            store.append(span(trace, 1, trace, &format!("svc-{}", trace))).unwrap();
        }
        // blocks: [0] evicted, [1], [2] immutable, [3] mutable
        let stats = store.stats();
        assert_eq!(stats.rotations, 3);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.immutable_blocks, 2);

        assert!(store.trace(TraceId(0)).unwrap().is_empty());
        assert!(!store.trace(TraceId(1)).unwrap().is_empty());
        assert_eq!(store.services().unwrap(), vec!["svc-1", "svc-2", "svc-3"]);
        assert!(store.span_names("svc-0").unwrap().is_empty());
        let ids: Vec<_> = store
            .traces(&Query::default())
            .unwrap()
            .iter()
            .map(|t| t.trace_id.get())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_services_and_span_names_merge_across_blocks() {
        let store = small_store(2, 8);
        store.append(span(1, 1, 1, "web")).unwrap();
        store.append(span(2, 1, 2, "db")).unwrap();
        store.append(span(3, 1, 3, "web")).unwrap();
        store.append(span(4, 1, 4, "api")).unwrap();
        store.append(span(5, 1, 5, "web")).unwrap();

        assert_eq!(store.services().unwrap(), vec!["api", "db", "web"]);
        assert_eq!(store.span_names("web").unwrap(), vec!["op-0", "op-1", "op-2"]);
        assert_eq!(store.span_names("db").unwrap(), vec!["op-2"]);
        assert!(store.span_names("unknown-service").unwrap().is_empty());
    }

    #[test]
    fn test_traces_limit_after_merge() {
        let store = small_store(5, 8);
        for trace in 0..10 {
            store.append(span(trace, 1, trace * 100, "web")).unwrap();
        }
        assert_eq!(store.stats().immutable_blocks, 1);

        let traces = store.traces(&Query::with_limit(3)).unwrap();
        let ids: Vec<_> = traces.iter().map(|t| t.trace_id.get()).collect();
        assert_eq!(ids, vec![7, 8, 9]);
    }
}
