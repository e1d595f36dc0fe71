//! Combining per-block partial results into one answer.
//!
//! A trace whose spans arrived across a rotation has a partial copy in
//! each block that saw it; every multi-block read folds those copies back
//! together by trace id.

use crate::core::{Trace, TraceId};
use ahash::AHashMap;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Ascending by minimum timestamp, ties broken by trace id.
pub fn by_min_timestamp(a: &Trace, b: &Trace) -> Ordering {
    a.min_timestamp
        .cmp(&b.min_timestamp)
        .then_with(|| a.trace_id.cmp(&b.trace_id))
}

/// K-way merge of individually sorted lists into one sorted list with each
/// distinct string exactly once.
pub fn merge_string_lists(lists: Vec<Vec<String>>) -> Vec<String> {
    let total = lists.iter().map(Vec::len).sum();
    let mut sources: Vec<_> = lists.into_iter().map(Vec::into_iter).collect();

    let mut heap = BinaryHeap::with_capacity(sources.len());
    for (idx, source) in sources.iter_mut().enumerate() {
        if let Some(head) = source.next() {
            heap.push(Reverse((head, idx)));
        }
    }

    let mut merged: Vec<String> = Vec::with_capacity(total);
    while let Some(Reverse((value, idx))) = heap.pop() {
        if let Some(next) = sources[idx].next() {
            heap.push(Reverse((next, idx)));
        }
        if merged.last() != Some(&value) {
            merged.push(value);
        }
    }
    merged
}

/// Folds partial copies of one trace into a single trace. Empty partials are
/// ignored; if all are empty the result is the empty trace.
pub fn merge_traces<I>(partials: I) -> Trace
where
    I: IntoIterator<Item = Trace>,
{
    partials.into_iter().fold(Trace::default(), |mut merged, partial| {
        merged.absorb(partial);
        merged
    })
}

/// Merges per-block trace lists, combining copies that share a trace id,
/// and returns them ascending by minimum timestamp. No limit is applied.
pub fn merge_trace_lists(lists: Vec<Vec<Trace>>) -> Vec<Trace> {
    let mut by_id: AHashMap<TraceId, Trace> = AHashMap::new();
    for trace in lists.into_iter().flatten() {
        if trace.is_empty() {
            continue;
        }
        by_id.entry(trace.trace_id).or_default().absorb(trace);
    }

    let mut merged: Vec<Trace> = by_id.into_values().collect();
    merged.sort_by(by_min_timestamp);
    merged
}
