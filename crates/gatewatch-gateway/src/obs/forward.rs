//! Forwarding sink: hands samples to a background task over a bounded queue.
//!
//! The request path only ever calls `try_send`. A full queue or a stopped
//! forwarder drops the sample and counts it under
//! `gatewatch_metrics_dropped_total{reason}`.

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};

use super::metrics::MetricsRegistry;
use super::sink::MetricSink;

pub(crate) const DROP_QUEUE_FULL: &str = "queue_full";
pub(crate) const DROP_CLOSED: &str = "closed";

#[derive(Debug)]
enum Sample {
    Counter {
        name: &'static str,
        labels: Vec<String>,
    },
    Duration {
        name: &'static str,
        labels: Vec<String>,
        millis: u64,
    },
}

impl Sample {
    fn name(&self) -> &'static str {
        match self {
            Sample::Counter { name, .. } | Sample::Duration { name, .. } => *name,
        }
    }
}

fn owned(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|v| v.to_string()).collect()
}

pub struct ForwardingSink {
    tx: mpsc::Sender<Sample>,
    registry: Arc<MetricsRegistry>,
}

/// Receiving half; apply with [`Forwarder::run`].
pub struct Forwarder {
    rx: mpsc::Receiver<Sample>,
    registry: Arc<MetricsRegistry>,
}

impl ForwardingSink {
    /// `capacity` is clamped to at least 1.
    pub fn new(registry: Arc<MetricsRegistry>, capacity: usize) -> (Self, Forwarder) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self { tx, registry: Arc::clone(&registry) },
            Forwarder { rx, registry },
        )
    }

    fn forward(&self, sample: Sample) {
        match self.tx.try_send(sample) {
            Ok(()) => {}
            Err(TrySendError::Full(s)) => self.registry.record_drop(s.name(), DROP_QUEUE_FULL),
            Err(TrySendError::Closed(s)) => self.registry.record_drop(s.name(), DROP_CLOSED),
        }
    }
}

impl MetricSink for ForwardingSink {
    fn inc_counter(&self, name: &'static str, labels: &[&str]) {
        self.forward(Sample::Counter { name, labels: owned(labels) });
    }

    fn record_duration(&self, name: &'static str, labels: &[&str], millis: u64) {
        self.forward(Sample::Duration { name, labels: owned(labels), millis });
    }

    fn label_arity(&self, name: &str) -> Option<usize> {
        self.registry.label_arity(name)
    }
}

impl Forwarder {
    /// Apply queued samples until every sender is gone.
    pub async fn run(mut self) {
        let mut applied: u64 = 0;
        while let Some(sample) = self.rx.recv().await {
            match sample {
                Sample::Counter { name, labels } => {
                    let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
                    self.registry.inc_counter(name, &refs);
                }
                Sample::Duration { name, labels, millis } => {
                    let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
                    self.registry.record_duration(name, &refs, millis);
                }
            }
            applied += 1;
        }
        tracing::debug!(applied, "metrics forwarder stopped");
    }
}
