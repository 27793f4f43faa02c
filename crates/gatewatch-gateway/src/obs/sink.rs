//! Metric sink port.
//!
//! The metrics stage talks to this trait only. The concrete sink is picked at
//! startup and injected as an `Arc`.

use std::sync::Arc;

use gatewatch_core::error::{GatewatchError, Result};
use gatewatch_core::names;

/// Fire-and-forget metric recording.
///
/// Implementations must not block on I/O, must be callable from many tasks
/// at once, and must never fail the caller: samples they cannot apply are
/// dropped (and counted where a self-metric exists).
pub trait MetricSink: Send + Sync + 'static {
    /// Increment a counter by one.
    fn inc_counter(&self, name: &'static str, labels: &[&str]);

    /// Record a duration sample in milliseconds.
    fn record_duration(&self, name: &'static str, labels: &[&str], millis: u64);

    /// Label arity the sink expects for `name`, or `None` if it does not know
    /// the metric.
    fn label_arity(&self, name: &str) -> Option<usize>;
}

pub type SharedSink = Arc<dyn MetricSink>;

/// Sink used when metrics are disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl MetricSink for NoopSink {
    fn inc_counter(&self, _name: &'static str, _labels: &[&str]) {}
    fn record_duration(&self, _name: &'static str, _labels: &[&str], _millis: u64) {}

    fn label_arity(&self, name: &str) -> Option<usize> {
        names::spec(name).map(|s| s.arity())
    }
}

/// Startup check: the sink knows `name` with exactly `expected` labels.
pub fn ensure_arity(sink: &dyn MetricSink, name: &str, expected: usize) -> Result<()> {
    match sink.label_arity(name) {
        None => Err(GatewatchError::UnknownMetric(name.to_string())),
        Some(actual) if actual != expected => Err(GatewatchError::LabelArity {
            name: name.to_string(),
            expected,
            actual,
        }),
        Some(_) => Ok(()),
    }
}
