//! Spanstore - bounded in-memory storage for distributed tracing spans.
//!
//! Spanstore is the storage tier of a tracing collector. It accepts a
//! continuous stream of spans and answers the queries a trace UI needs:
//! known services, operation names per service, a single trace by id and
//! traces matching a filter.
//!
//! # Architecture
//!
//! - `core`: spans, traces, queries, configuration and errors
//! - `storage`: mutable and immutable blocks, the store coordinator and the
//!   merge functions combining per-block results
//! - `cli`: synthetic-load driver for the store
//!
//! # Example
//!
//! ```
//! use spanstore::core::{Annotation, Endpoint, Query, Span, TraceId};
//! use spanstore::storage::{InMemoryStore, ReadStore, SpanStore};
//!
//! let store = InMemoryStore::new();
//! let span = Span::builder()
//!     .trace_id(42)
//!     .name("get /users")
//!     .timestamp(1_000)
//!     .annotation(Annotation::new(1_000, "sr").with_host(Endpoint::new("frontend")))
//!     .build()?;
//! store.append(span)?;
//!
//! assert_eq!(store.services()?, vec!["frontend"]);
//! assert_eq!(store.trace(TraceId(42))?.span_count(), 1);
//! assert_eq!(store.traces(&Query::with_limit(10))?.len(), 1);
//! # Ok::<(), spanstore::core::StoreError>(())
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod cli;
pub mod core;
pub mod storage;

// Re-export core types for convenience
pub use crate::core::{Config, Result};
pub use crate::storage::{InMemoryStore, ReadStore, SpanStore};
