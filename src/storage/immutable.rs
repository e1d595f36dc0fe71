//! Frozen, read-only snapshot of a retired mutable block.

use super::mutable::{BlockData, MutableBlock};
use super::{merge, ReadStore};
use crate::core::{Query, Result, Trace, TraceId};
use ahash::AHashMap;

/// Read-only block. Nothing is mutated after construction, so reads take no
/// lock of their own.
///
/// Traces are stored pre-sorted by minimum timestamp and the indexes
/// pre-sorted lexicographically, so every read is a lookup or a tail scan.
#[derive(Debug, Default)]
pub struct ImmutableBlock {
    traces: Vec<Trace>,
    positions: AHashMap<TraceId, usize>,
    services: Vec<String>,
    span_names: AHashMap<String, Vec<String>>,
}

impl ImmutableBlock {
    /// Number of distinct traces held
    pub fn len(&self) -> usize {
        self.traces.len()
    }

    /// Returns true if no traces are held
    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// Total spans across all traces
    pub fn span_count(&self) -> usize {
        self.traces.iter().map(Trace::span_count).sum()
    }

    /// Earliest and latest trace minimum timestamps, if any traces are held
    pub fn time_range(&self) -> Option<(i64, i64)> {
        Some((self.traces.first()?.min_timestamp, self.traces.last()?.min_timestamp))
    }
}

impl From<BlockData> for ImmutableBlock {
    fn from(data: BlockData) -> Self {
        let mut traces: Vec<Trace> = data.traces.into_values().collect();
        traces.sort_by(merge::by_min_timestamp);

        let positions = traces
            .iter()
            .enumerate()
            .map(|(pos, trace)| (trace.trace_id, pos))
            .collect();

        let mut services: Vec<String> = data.services.into_iter().collect();
        services.sort_unstable();

        let span_names = data
            .span_names
            .into_iter()
            .map(|(service, names)| {
                let mut names: Vec<String> = names.into_iter().collect();
                names.sort_unstable();
                (service, names)
            })
            .collect();

        Self {
            traces,
            positions,
            services,
            span_names,
        }
    }
}

/// Freezes a block. Ownership moves into the snapshot, so the retired block
/// can never be written again.
impl From<MutableBlock> for ImmutableBlock {
    fn from(block: MutableBlock) -> Self {
        Self::from(block.into_data())
    }
}

impl ReadStore for ImmutableBlock {
    fn services(&self) -> Result<Vec<String>> {
        Ok(self.services.clone())
    }

    fn span_names(&self, service: &str) -> Result<Vec<String>> {
        Ok(self.span_names.get(service).cloned().unwrap_or_default())
    }

    fn trace(&self, id: TraceId) -> Result<Trace> {
        Ok(self
            .positions
            .get(&id)
            .map(|&pos| self.traces[pos].clone())
            .unwrap_or_default())
    }

    fn traces(&self, query: &Query) -> Result<Vec<Trace>> {
        let take = if query.limit > 0 { query.limit } else { usize::MAX };
        let mut matches: Vec<Trace> = self
            .traces
            .iter()
            .rev()
            .filter(|trace| trace.matches(query))
            .take(take)
            .cloned()
            .collect();
        matches.reverse();
        Ok(matches)
    }
}
