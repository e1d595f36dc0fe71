use crate::core::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// 64-bit identifier shared by every span of one trace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TraceId(pub i64);

/// 64-bit identifier of a single span
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpanId(pub i64);

impl TraceId {
    /// Returns the raw identifier value
    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for TraceId {
    fn from(id: i64) -> Self {
        TraceId(id)
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl From<i64> for SpanId {
    fn from(id: i64) -> Self {
        SpanId(id)
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Network location of the service that recorded an annotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Name of the service, lowercase by convention
    pub service_name: String,
    /// IPv4 address of the host, if known
    pub ipv4: Option<Ipv4Addr>,
    /// Listening port, if known
    pub port: Option<u16>,
}

impl Endpoint {
    /// Creates an endpoint carrying only a service name
    pub fn new<S: Into<String>>(service_name: S) -> Self {
        Self {
            service_name: service_name.into(),
            ipv4: None,
            port: None,
        }
    }

    /// Attaches an address and port
    pub fn with_address(mut self, ipv4: Ipv4Addr, port: u16) -> Self {
        self.ipv4 = Some(ipv4);
        self.port = Some(port);
        self
    }
}

/// Timestamped event recorded on a span, e.g. "cs" or "sr"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Microseconds since epoch
    pub timestamp: i64,
    /// Event name
    pub value: String,
    /// Endpoint that recorded the event
    pub host: Option<Endpoint>,
}

impl Annotation {
    /// Creates an annotation without a host
    pub fn new<S: Into<String>>(timestamp: i64, value: S) -> Self {
        Self {
            timestamp,
            value: value.into(),
            host: None,
        }
    }

    /// Attaches the recording endpoint
    pub fn with_host(mut self, host: Endpoint) -> Self {
        self.host = Some(host);
        self
    }
}

/// Key/value tag recorded on a span
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryAnnotation {
    /// Tag key
    pub key: String,
    /// Tag value
    pub value: String,
    /// Endpoint that recorded the tag
    pub host: Option<Endpoint>,
}

impl BinaryAnnotation {
    /// Creates a tag without a host
    pub fn new<K: Into<String>, V: Into<String>>(key: K, value: V) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            host: None,
        }
    }

    /// Attaches the recording endpoint
    pub fn with_host(mut self, host: Endpoint) -> Self {
        self.host = Some(host);
        self
    }
}

/// A single timed operation within a trace.
///
/// Spans are treated as immutable once handed to a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// Trace this span belongs to
    pub trace_id: TraceId,
    /// Identifier of this span
    pub id: SpanId,
    /// Parent span, absent for the root
    pub parent_id: Option<SpanId>,
    /// Operation name
    pub name: String,
    /// Start time in microseconds since epoch
    pub timestamp: i64,
    /// Duration in microseconds, if the span completed
    pub duration: Option<i64>,
    /// Timestamped events
    pub annotations: Vec<Annotation>,
    /// Key/value tags
    pub binary_annotations: Vec<BinaryAnnotation>,
    /// Forced sampling flag
    pub debug: bool,
}

impl Span {
    /// Creates a new span builder
    pub fn builder() -> SpanBuilder {
        SpanBuilder::default()
    }

    /// Returns true if this span has no parent
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Service names referenced by the hosts of this span's annotations and
    /// binary annotations. May yield the same name more than once.
    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.annotations
            .iter()
            .filter_map(|a| a.host.as_ref())
            .chain(self.binary_annotations.iter().filter_map(|b| b.host.as_ref()))
            .map(|host| host.service_name.as_str())
            .filter(|name| !name.is_empty())
    }

    /// Returns true if any annotation host names the given service
    pub fn has_service(&self, service: &str) -> bool {
        self.service_names().any(|name| name == service)
    }
}

/// Builder for creating Span instances
#[derive(Default)]
pub struct SpanBuilder {
    trace_id: Option<TraceId>,
    id: Option<SpanId>,
    parent_id: Option<SpanId>,
    name: Option<String>,
    timestamp: Option<i64>,
    duration: Option<i64>,
    annotations: Vec<Annotation>,
    binary_annotations: Vec<BinaryAnnotation>,
    debug: bool,
}

impl SpanBuilder {
    pub fn trace_id<T: Into<TraceId>>(mut self, trace_id: T) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn id<T: Into<SpanId>>(mut self, id: T) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn parent_id<T: Into<SpanId>>(mut self, parent_id: T) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn duration(mut self, duration: i64) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn binary_annotation(mut self, annotation: BinaryAnnotation) -> Self {
        self.binary_annotations.push(annotation);
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Validates and builds the span. The span id defaults to the trace id,
    /// the timestamp to the earliest annotation timestamp (or zero).
    pub fn build(self) -> Result<Span> {
        let trace_id = self
            .trace_id
            .ok_or_else(|| StoreError::invalid_span("trace_id is required"))?;
        let name = self
            .name
            .ok_or_else(|| StoreError::invalid_span("name is required"))?;
        if name.is_empty() {
            return Err(StoreError::invalid_span("name cannot be empty"));
        }
        if matches!(self.duration, Some(d) if d < 0) {
            return Err(StoreError::invalid_span("duration cannot be negative"));
        }

        let timestamp = self.timestamp.unwrap_or_else(|| {
            self.annotations
                .iter()
                .map(|a| a.timestamp)
                .min()
                .unwrap_or(0)
        });

        Ok(Span {
            trace_id,
            id: self.id.unwrap_or(SpanId(trace_id.0)),
            parent_id: self.parent_id,
            name,
            timestamp,
            duration: self.duration,
            annotations: self.annotations,
            binary_annotations: self.binary_annotations,
            debug: self.debug,
        })
    }
}

/// All spans sharing a trace identifier, as held by one block or merged
/// across blocks.
///
/// `spans` is kept ascending by timestamp and `min_timestamp` is the minimum
/// timestamp across them. The default value is the empty trace returned for
/// unknown identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    /// Shared trace identifier
    pub trace_id: TraceId,
    /// Spans ascending by timestamp
    pub spans: Vec<Span>,
    /// Earliest span timestamp, zero when empty
    pub min_timestamp: i64,
}

impl Trace {
    /// Creates an empty trace for the identifier
    pub fn new(trace_id: TraceId) -> Self {
        Self {
            trace_id,
            spans: Vec::new(),
            min_timestamp: 0,
        }
    }

    /// Returns true if no spans are held
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Number of spans held
    pub fn span_count(&self) -> usize {
        self.spans.len()
    }

    /// Adds a span, keeping spans ordered by timestamp and the minimum
    /// timestamp current.
    pub fn push(&mut self, span: Span) {
        if self.spans.is_empty() || span.timestamp < self.min_timestamp {
            self.min_timestamp = span.timestamp;
        }
        self.spans.push(span);
        // Stable: spans sharing a timestamp keep arrival order.
        self.spans.sort_by_key(|s| s.timestamp);
    }

    /// Absorbs the spans of another partial copy of the same trace.
    pub fn absorb(&mut self, other: Trace) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() || other.min_timestamp < self.min_timestamp {
            self.min_timestamp = other.min_timestamp;
        }
        self.trace_id = other.trace_id;
        self.spans.extend(other.spans);
        self.spans.sort_by_key(|s| s.timestamp);
    }

    /// Sorted, distinct service names across all spans
    pub fn service_names(&self) -> Vec<&str> {
        let mut services: Vec<_> = self.spans.iter().flat_map(Span::service_names).collect();
        services.sort_unstable();
        services.dedup();
        services
    }

    /// Returns the root span if one is present
    pub fn root_span(&self) -> Option<&Span> {
        self.spans.iter().find(|span| span.is_root())
    }
}
