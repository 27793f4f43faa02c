//! Metric catalog.
//!
//! Every metric the gateway emits is declared here with its kind and its
//! ordered label names. Sinks are built from this table at startup, so the
//! label arity of a name is fixed for the life of the process.

/// Total requests entering the metrics stage.
pub const REQUEST_TOTAL: &str = "gatewatch_request_total";
/// Requests by route path and rpc type.
pub const REQUEST_TYPE_TOTAL: &str = "gatewatch_request_type_total";
/// Requests whose downstream chain returned an error.
pub const REQUEST_THROW_TOTAL: &str = "gatewatch_request_throw_total";

/// Sentinel flow-control rejections (429).
pub const SENTINEL_REQUEST_RESTRICT_TOTAL: &str = "sentinel_request_restrict_total";
/// Sentinel breaker trips (500).
pub const SENTINEL_REQUEST_CIRCUITBREAKER_TOTAL: &str = "sentinel_request_circuitbreaker_total";
/// Resilience4j rate-limiter rejections (429).
pub const RESILIENCE4J_REQUEST_RESTRICT_TOTAL: &str = "resilience4j_request_restrict_total";
/// Resilience4j breaker trips (500).
pub const RESILIENCE4J_REQUEST_CIRCUITBREAKER_TOTAL: &str =
    "resilience4j_request_circuitbreaker_total";
/// Hystrix breaker trips (500).
pub const HYSTRIX_REQUEST_CIRCUITBREAKER_TOTAL: &str = "hystrix_request_circuitbreaker_total";
/// Standalone rate-limiter rejections (429).
pub const RATELIMITER_REQUEST_RESTRICT_TOTAL: &str = "ratelimiter_request_restrict_total";

/// End-to-end latency, milliseconds.
pub const EXECUTE_LATENCY_MILLIS: &str = "gatewatch_execute_latency_millis";
/// End-to-end latency by route path, milliseconds.
pub const EXECUTE_LATENCY_PATH_MILLIS: &str = "gatewatch_execute_latency_path_millis";

/// Samples a sink could not apply (self-metric).
pub const METRICS_DROPPED_TOTAL: &str = "gatewatch_metrics_dropped_total";

/// Raw URI path.
pub const LABEL_PATH: &str = "path";
/// Rpc type of the route.
pub const LABEL_TYPE: &str = "type";
/// Why a sample was dropped.
pub const LABEL_REASON: &str = "reason";

/// Prometheus family type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Histogram,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Histogram => "histogram",
        }
    }
}

/// Static declaration of one metric family.
#[derive(Debug, Clone, Copy)]
pub struct MetricSpec {
    pub name: &'static str,
    pub kind: MetricKind,
    pub labels: &'static [&'static str],
    pub help: &'static str,
}

impl MetricSpec {
    /// Counter family with the given ordered labels.
    pub const fn counter(
        name: &'static str,
        labels: &'static [&'static str],
        help: &'static str,
    ) -> Self {
        Self { name, kind: MetricKind::Counter, labels, help }
    }

    /// Histogram family (milliseconds) with the given ordered labels.
    pub const fn histogram(
        name: &'static str,
        labels: &'static [&'static str],
        help: &'static str,
    ) -> Self {
        Self { name, kind: MetricKind::Histogram, labels, help }
    }

    /// Number of label values every sample must carry.
    pub fn arity(&self) -> usize {
        self.labels.len()
    }
}

pub const CATALOG: &[MetricSpec] = &[
    MetricSpec::counter(REQUEST_TOTAL, &[], "Requests seen by the metrics stage"),
    MetricSpec::counter(
        REQUEST_TYPE_TOTAL,
        &[LABEL_PATH, LABEL_TYPE],
        "Requests by route path and rpc type",
    ),
    MetricSpec::counter(
        REQUEST_THROW_TOTAL,
        &[],
        "Requests whose downstream chain failed",
    ),
    MetricSpec::counter(
        SENTINEL_REQUEST_RESTRICT_TOTAL,
        &[],
        "Requests restricted by sentinel",
    ),
    MetricSpec::counter(
        SENTINEL_REQUEST_CIRCUITBREAKER_TOTAL,
        &[],
        "Requests short-circuited by sentinel",
    ),
    MetricSpec::counter(
        RESILIENCE4J_REQUEST_RESTRICT_TOTAL,
        &[],
        "Requests restricted by resilience4j",
    ),
    MetricSpec::counter(
        RESILIENCE4J_REQUEST_CIRCUITBREAKER_TOTAL,
        &[],
        "Requests short-circuited by resilience4j",
    ),
    MetricSpec::counter(
        HYSTRIX_REQUEST_CIRCUITBREAKER_TOTAL,
        &[],
        "Requests short-circuited by hystrix",
    ),
    MetricSpec::counter(
        RATELIMITER_REQUEST_RESTRICT_TOTAL,
        &[],
        "Requests restricted by the rate limiter",
    ),
    MetricSpec::histogram(
        EXECUTE_LATENCY_MILLIS,
        &[],
        "End-to-end request latency in milliseconds",
    ),
    MetricSpec::histogram(
        EXECUTE_LATENCY_PATH_MILLIS,
        &[LABEL_PATH],
        "End-to-end request latency by route path in milliseconds",
    ),
    MetricSpec::counter(
        METRICS_DROPPED_TOTAL,
        &[LABEL_REASON],
        "Metric samples dropped by the sink",
    ),
];

/// Look up a catalog entry by name.
pub fn spec(name: &str) -> Option<&'static MetricSpec> {
    CATALOG.iter().find(|s| s.name == name)
}
