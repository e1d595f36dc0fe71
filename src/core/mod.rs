//! Domain models shared by the store and its collaborators.
//!
//! Spans, traces and queries live here, together with configuration and
//! the crate's error type.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod query;
pub mod types;

// Re-export commonly used types
pub use config::{Config, ConfigBuilder, LogLevel, StoreConfig};
pub use error::{Result, StoreError};
pub use query::{Query, QueryBuilder};
pub use types::{Annotation, BinaryAnnotation, Endpoint, Span, SpanBuilder, SpanId, Trace, TraceId};
