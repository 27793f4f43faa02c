//! Lightweight in-process metrics.
//!
//! Samples are stored as atomics and rendered by the `/metrics` handler in
//! Prometheus text format. The request path only sees the [`MetricSink`]
//! trait; which sink backs it is decided at startup.

pub mod forward;
pub mod metrics;
pub mod sink;

pub use forward::{Forwarder, ForwardingSink};
pub use metrics::{HistogramSnapshot, MetricsRegistry, RegistryBuilder, DEFAULT_LATENCY_BUCKETS_MS};
pub use sink::{ensure_arity, MetricSink, NoopSink, SharedSink};
