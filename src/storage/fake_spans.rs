//! Fake span generator for load testing and demo purposes.
//!
//! Produces whole traces shaped like RPC call trees: a root span at the
//! gateway and child calls to downstream services, each annotated with the
//! client and server endpoints that recorded it.

use crate::core::{Annotation, BinaryAnnotation, Endpoint, Result, Span, TraceId};
use rand::{thread_rng, Rng};
use std::net::Ipv4Addr;

/// Latency and failure profile of a simulated service.
#[derive(Debug, Clone)]
struct ServiceProfile {
    /// Service name
    name: &'static str,
    /// Base error rate (0.0 to 1.0)
    error_rate: f64,
    /// Base P50 latency in milliseconds
    p50_ms: u64,
    /// Base P95 latency in milliseconds
    p95_ms: u64,
    /// Base P99 latency in milliseconds
    p99_ms: u64,
    /// Operations this service serves
    operations: &'static [&'static str],
    /// Last octet of the host address
    host: u8,
}

impl ServiceProfile {
    fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.name).with_address(Ipv4Addr::new(10, 0, 0, self.host), 8080)
    }

    /// Generate a latency in microseconds based on percentiles.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn latency_us<R: Rng>(&self, rng: &mut R) -> i64 {
        let percentile: f64 = rng.gen();

        let ms = if percentile < 0.5 {
            self.p50_ms as f64 * percentile * 2.0
        } else if percentile < 0.95 {
            let range = (self.p95_ms - self.p50_ms) as f64;
            self.p50_ms as f64 + range * (percentile - 0.5) / 0.45
        } else {
            let range = (self.p99_ms - self.p95_ms) as f64;
            self.p95_ms as f64 + range * (percentile - 0.95) / 0.05
        };

        let jitter = rng.gen_range(0.9..1.1);
        ((ms * jitter * 1_000.0) as i64).max(1)
    }

    fn operation<R: Rng>(&self, rng: &mut R) -> &'static str {
        self.operations[rng.gen_range(0..self.operations.len())]
    }
}

const SERVICES: &[ServiceProfile] = &[
    ServiceProfile {
        name: "api-gateway",
        error_rate: 0.001,
        p50_ms: 20,
        p95_ms: 50,
        p99_ms: 100,
        operations: &["GET /api/v1/users", "POST /api/v1/orders", "GET /api/v1/products"],
        host: 10,
    },
    ServiceProfile {
        name: "user-service",
        error_rate: 0.002,
        p50_ms: 15,
        p95_ms: 40,
        p99_ms: 80,
        operations: &["getUserById", "updateUser", "listUsers", "authenticateUser"],
        host: 11,
    },
    ServiceProfile {
        name: "order-service",
        error_rate: 0.005,
        p50_ms: 30,
        p95_ms: 80,
        p99_ms: 150,
        operations: &["createOrder", "getOrder", "updateOrderStatus", "cancelOrder"],
        host: 12,
    },
    ServiceProfile {
        name: "payment-service",
        error_rate: 0.02,
        p50_ms: 100,
        p95_ms: 300,
        p99_ms: 500,
        operations: &["processPayment", "refundPayment", "validateCard", "getPaymentStatus"],
        host: 13,
    },
    ServiceProfile {
        name: "inventory-service",
        error_rate: 0.003,
        p50_ms: 10,
        p95_ms: 25,
        p99_ms: 50,
        operations: &["checkStock", "reserveItems", "updateInventory", "getProductInfo"],
        host: 14,
    },
];

const ERROR_MESSAGES: &[&str] = &[
    "Connection timeout",
    "Database error",
    "Service unavailable",
    "Rate limit exceeded",
    "Resource not found",
];

/// Fake span generator that produces realistic RPC traces.
#[derive(Debug, Clone)]
pub struct SpanGenerator {
    /// Gateway first, then downstream services
    services: &'static [ServiceProfile],
}

impl SpanGenerator {
    /// Create a new generator over the default service topology.
    pub fn new() -> Self {
        Self { services: SERVICES }
    }

    /// Names of every service the generator may emit.
    pub fn service_names(&self) -> Vec<&'static str> {
        self.services.iter().map(|s| s.name).collect()
    }

    /// Generate one trace of `span_count` spans starting at `start_us`.
    pub fn generate_trace(&self, trace_id: TraceId, span_count: usize, start_us: i64) -> Result<Vec<Span>> {
        self.generate_trace_with(&mut thread_rng(), trace_id, span_count, start_us)
    }

    /// Same as [`generate_trace`](Self::generate_trace) with a caller-supplied
    /// random source.
    pub fn generate_trace_with<R: Rng>(
        &self,
        rng: &mut R,
        trace_id: TraceId,
        span_count: usize,
        start_us: i64,
    ) -> Result<Vec<Span>> {
        let mut spans = Vec::with_capacity(span_count);
        if span_count == 0 {
            return Ok(spans);
        }

        let gateway = &self.services[0];
        let root_duration = gateway.latency_us(rng);
        let root_id = trace_id.get();
        spans.push(server_span(
            rng,
            gateway,
            None,
            trace_id,
            root_id,
            start_us,
            root_duration,
        )?);

        let mut offset = 0;
        for n in 1..span_count {
            let callee = &self.services[rng.gen_range(1..self.services.len())];
            let duration = callee.latency_us(rng);
            offset += rng.gen_range(0..=root_duration / span_count as i64 + 1);
            let span_id = root_id.wrapping_add(n as i64);
            spans.push(server_span(
                rng,
                callee,
                Some((gateway, root_id)),
                trace_id,
                span_id,
                start_us + offset,
                duration,
            )?);
        }

        Ok(spans)
    }
}

impl Default for SpanGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a span recorded by `callee`, and by `caller` on the client side
/// when the span has a parent.
fn server_span<R: Rng>(
    rng: &mut R,
    callee: &ServiceProfile,
    caller: Option<(&ServiceProfile, i64)>,
    trace_id: TraceId,
    span_id: i64,
    timestamp: i64,
    duration: i64,
) -> Result<Span> {
    let server = callee.endpoint();
    let mut builder = Span::builder()
        .trace_id(trace_id)
        .id(span_id)
        .name(callee.operation(rng))
        .timestamp(timestamp)
        .duration(duration);

    if let Some((parent, parent_id)) = caller {
        let client = parent.endpoint();
        builder = builder
            .parent_id(parent_id)
            .annotation(Annotation::new(timestamp, "cs").with_host(client.clone()))
            .annotation(Annotation::new(timestamp + duration, "cr").with_host(client));
    }

    builder = builder
        .annotation(Annotation::new(timestamp, "sr").with_host(server.clone()))
        .annotation(Annotation::new(timestamp + duration, "ss").with_host(server.clone()))
        .binary_annotation(BinaryAnnotation::new("environment", "production").with_host(server.clone()));

    if rng.gen::<f64>() < callee.error_rate {
        let msg = ERROR_MESSAGES[rng.gen_range(0..ERROR_MESSAGES.len())];
        builder = builder.binary_annotation(BinaryAnnotation::new("error", msg).with_host(server));
    }

    builder.build()
}
