//! Block-partitioned in-memory storage for trace spans.
//!
//! [`InMemoryStore`] routes appends to a single [`MutableBlock`] and keeps a
//! bounded, oldest-first run of frozen [`ImmutableBlock`]s behind it. Every
//! read fans out to all blocks and is combined by the functions in
//! [`merge`].

use crate::core::{Query, Result, Span, Trace, TraceId};

pub mod fake_spans;
pub mod immutable;
pub mod memory;
pub mod merge;
pub mod mutable;
pub mod types;

// Re-export commonly used types
pub use fake_spans::SpanGenerator;
pub use immutable::ImmutableBlock;
pub use memory::InMemoryStore;
pub use mutable::MutableBlock;
pub use types::StoreStats;

/// Read side shared by blocks and stores.
///
/// Absence is never an error: unknown services yield empty lists and
/// unknown trace ids yield the empty [`Trace`].
pub trait ReadStore: Send + Sync {
    /// Known service names, in no particular order for a single block.
    fn services(&self) -> Result<Vec<String>>;

    /// Known operation names recorded under a service.
    fn span_names(&self, service: &str) -> Result<Vec<String>>;

    /// All spans held for a trace id.
    fn trace(&self, id: TraceId) -> Result<Trace>;

    /// Matching traces ascending by minimum timestamp, keeping the last
    /// `query.limit` when a limit is set.
    fn traces(&self, query: &Query) -> Result<Vec<Trace>>;
}

/// A store that also accepts spans.
pub trait SpanStore: ReadStore {
    /// Ingest one span. In-memory implementations never fail.
    fn append(&self, span: Span) -> Result<()>;
}
