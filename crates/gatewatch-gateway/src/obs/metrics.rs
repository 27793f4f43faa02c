//! In-process metrics registry for the gateway.
//!
//! No exporter crates are used; this module provides counter and histogram
//! families keyed by ordered label values and backed by `DashMap` + atomics.
//! The set of families and their label names is fixed when the registry is
//! built, so a label-arity mismatch is a startup error for wiring and a
//! counted drop for a stray call. Histogram buckets are integer milliseconds
//! to avoid floating point math.

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use gatewatch_core::error::{GatewatchError, Result};
use gatewatch_core::names::{self, MetricKind, MetricSpec};

use super::sink::MetricSink;

/// 5ms .. 10s.
pub const DEFAULT_LATENCY_BUCKETS_MS: [u64; 11] =
    [5, 10, 25, 50, 100, 250, 500, 1_000, 2_500, 5_000, 10_000];

pub(crate) const DROP_UNKNOWN: &str = "unknown";
pub(crate) const DROP_KIND: &str = "kind";
pub(crate) const DROP_ARITY: &str = "arity";

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn label_str(names: &[&str], values: &[String]) -> String {
    names
        .iter()
        .zip(values)
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

fn owned_key(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|v| v.to_string()).collect()
}

#[derive(Default)]
struct CounterVec {
    map: DashMap<Vec<String>, AtomicU64>,
}

impl CounterVec {
    fn add(&self, labels: &[&str], v: u64) {
        let counter = self
            .map
            .entry(owned_key(labels))
            .or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    fn get(&self, labels: &[&str]) -> Option<u64> {
        self.map
            .get(&owned_key(labels))
            .map(|c| c.load(Ordering::Relaxed))
    }

    fn render(&self, spec: &MetricSpec, out: &mut String) {
        let mut rows: Vec<(Vec<String>, u64)> = self
            .map
            .iter()
            .map(|r| (r.key().clone(), r.value().load(Ordering::Relaxed)))
            .collect();
        rows.sort();
        for (key, val) in rows {
            if key.is_empty() {
                let _ = writeln!(out, "{} {}", spec.name, val);
            } else {
                let _ = writeln!(out, "{}{{{}}} {}", spec.name, label_str(spec.labels, &key), val);
            }
        }
    }
}

struct AtomicHistogram {
    count: AtomicU64,
    sum: AtomicU64,
    buckets: Box<[AtomicU64]>,
}

impl AtomicHistogram {
    fn new(n: usize) -> Self {
        Self {
            count: AtomicU64::new(0),
            sum: AtomicU64::new(0),
            buckets: (0..n).map(|_| AtomicU64::new(0)).collect(),
        }
    }
}

/// Point-in-time copy of one histogram series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistogramSnapshot {
    pub count: u64,
    /// Sum of observations, milliseconds.
    pub sum: u64,
    /// Cumulative `(le_ms, count)` pairs, `+Inf` excluded.
    pub buckets: Vec<(u64, u64)>,
}

struct HistogramVec {
    bounds: Vec<u64>,
    map: DashMap<Vec<String>, AtomicHistogram>,
}

impl HistogramVec {
    fn new(bounds: Vec<u64>) -> Self {
        Self { bounds, map: DashMap::new() }
    }

    /// Observe a value and increment cumulative buckets (millisecond scale).
    fn observe(&self, labels: &[&str], millis: u64) {
        let hist = self
            .map
            .entry(owned_key(labels))
            .or_insert_with(|| AtomicHistogram::new(self.bounds.len()));

        hist.count.fetch_add(1, Ordering::Relaxed);
        hist.sum.fetch_add(millis, Ordering::Relaxed);

        // Cumulative: every bucket whose bound covers the value.
        for (i, &le) in self.bounds.iter().enumerate() {
            if millis <= le {
                hist.buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn snapshot(&self, labels: &[&str]) -> Option<HistogramSnapshot> {
        let hist = self.map.get(&owned_key(labels))?;
        Some(HistogramSnapshot {
            count: hist.count.load(Ordering::Relaxed),
            sum: hist.sum.load(Ordering::Relaxed),
            buckets: self
                .bounds
                .iter()
                .zip(hist.buckets.iter())
                .map(|(le, c)| (*le, c.load(Ordering::Relaxed)))
                .collect(),
        })
    }

    /// Render in Prometheus text exposition format (unit: milliseconds).
    fn render(&self, spec: &MetricSpec, out: &mut String) {
        let mut keys: Vec<Vec<String>> = self.map.iter().map(|r| r.key().clone()).collect();
        keys.sort();
        for key in keys {
            let Some(hist) = self.map.get(&key) else { continue };
            let labels = label_str(spec.labels, &key);
            let prefix = if labels.is_empty() { String::new() } else { format!("{},", labels) };
            let braces = if labels.is_empty() { String::new() } else { format!("{{{}}}", labels) };

            for (i, &le) in self.bounds.iter().enumerate() {
                let count = hist.buckets[i].load(Ordering::Relaxed);
                let _ = writeln!(out, "{}_bucket{{{}le=\"{}\"}} {}", spec.name, prefix, le, count);
            }
            let count = hist.count.load(Ordering::Relaxed);
            let _ = writeln!(out, "{}_bucket{{{}le=\"+Inf\"}} {}", spec.name, prefix, count);

            let sum = hist.sum.load(Ordering::Relaxed);
            let _ = writeln!(out, "{}_sum{} {}", spec.name, braces, sum);
            let _ = writeln!(out, "{}_count{} {}", spec.name, braces, count);
        }
    }
}

enum Family {
    Counter(CounterVec),
    Histogram(HistogramVec),
}

struct Entry {
    spec: MetricSpec,
    family: Family,
}

/// Process-wide metric registry. Built once at startup, shared via `Arc`.
pub struct MetricsRegistry {
    entries: Vec<Entry>,
    index: HashMap<&'static str, usize>,
}

impl MetricsRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Registry holding every metric in the core catalog.
    pub fn with_catalog(latency_buckets_ms: Vec<u64>) -> Result<Self> {
        Self::builder()
            .latency_buckets_ms(latency_buckets_ms)
            .register_all(names::CATALOG)
            .build()
    }

    pub fn spec(&self, name: &str) -> Option<&MetricSpec> {
        self.index.get(name).map(|&i| &self.entries[i].spec)
    }

    pub fn counter_value(&self, name: &str, labels: &[&str]) -> Option<u64> {
        match &self.entry(name)?.family {
            Family::Counter(c) => c.get(labels),
            Family::Histogram(_) => None,
        }
    }

    pub fn histogram_snapshot(&self, name: &str, labels: &[&str]) -> Option<HistogramSnapshot> {
        match &self.entry(name)?.family {
            Family::Histogram(h) => h.snapshot(labels),
            Family::Counter(_) => None,
        }
    }

    /// Render every family in registration order.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for e in &self.entries {
            let _ = writeln!(out, "# HELP {} {}", e.spec.name, e.spec.help);
            let _ = writeln!(out, "# TYPE {} {}", e.spec.name, e.spec.kind.as_str());
            match &e.family {
                Family::Counter(c) => c.render(&e.spec, &mut out),
                Family::Histogram(h) => h.render(&e.spec, &mut out),
            }
        }
        out
    }

    /// Count a sample that could not be applied. Ignored when the self-metric
    /// is not registered.
    pub(crate) fn record_drop(&self, name: &str, reason: &'static str) {
        tracing::debug!(metric = %name, reason, "metric sample dropped");
        if let Some(Entry { family: Family::Counter(c), spec }) = self.entry(names::METRICS_DROPPED_TOTAL) {
            if spec.arity() == 1 {
                c.add(&[reason], 1);
            }
        }
    }

    fn entry(&self, name: &str) -> Option<&Entry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    fn resolve(&self, name: &str, kind: MetricKind, arity: usize) -> std::result::Result<&Family, &'static str> {
        let e = self.entry(name).ok_or(DROP_UNKNOWN)?;
        if e.spec.kind != kind {
            return Err(DROP_KIND);
        }
        if e.spec.arity() != arity {
            return Err(DROP_ARITY);
        }
        Ok(&e.family)
    }
}

impl MetricSink for MetricsRegistry {
    fn inc_counter(&self, name: &'static str, labels: &[&str]) {
        match self.resolve(name, MetricKind::Counter, labels.len()) {
            Ok(Family::Counter(c)) => c.add(labels, 1),
            Ok(Family::Histogram(_)) => self.record_drop(name, DROP_KIND),
            Err(reason) => self.record_drop(name, reason),
        }
    }

    fn record_duration(&self, name: &'static str, labels: &[&str], millis: u64) {
        match self.resolve(name, MetricKind::Histogram, labels.len()) {
            Ok(Family::Histogram(h)) => h.observe(labels, millis),
            Ok(Family::Counter(_)) => self.record_drop(name, DROP_KIND),
            Err(reason) => self.record_drop(name, reason),
        }
    }

    fn label_arity(&self, name: &str) -> Option<usize> {
        self.spec(name).map(MetricSpec::arity)
    }
}

/// Validating builder for [`MetricsRegistry`].
pub struct RegistryBuilder {
    buckets: Vec<u64>,
    specs: Vec<MetricSpec>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self {
            buckets: DEFAULT_LATENCY_BUCKETS_MS.to_vec(),
            specs: Vec::new(),
        }
    }
}

impl RegistryBuilder {
    pub fn latency_buckets_ms(mut self, buckets: Vec<u64>) -> Self {
        self.buckets = buckets;
        self
    }

    pub fn register(mut self, spec: MetricSpec) -> Self {
        self.specs.push(spec);
        self
    }

    pub fn register_all(mut self, specs: &[MetricSpec]) -> Self {
        self.specs.extend_from_slice(specs);
        self
    }

    pub fn build(self) -> Result<MetricsRegistry> {
        validate_buckets(&self.buckets)?;

        let mut entries = Vec::with_capacity(self.specs.len());
        let mut index = HashMap::with_capacity(self.specs.len());

        for spec in self.specs {
            validate_spec(&spec)?;
            if index.insert(spec.name, entries.len()).is_some() {
                return Err(GatewatchError::Config(format!(
                    "metric registered twice: {}",
                    spec.name
                )));
            }

            let family = match spec.kind {
                MetricKind::Counter => {
                    let c = CounterVec::default();
                    if spec.arity() == 0 {
                        c.add(&[], 0);
                    }
                    Family::Counter(c)
                }
                MetricKind::Histogram => Family::Histogram(HistogramVec::new(self.buckets.clone())),
            };
            entries.push(Entry { spec, family });
        }

        Ok(MetricsRegistry { entries, index })
    }
}

pub(crate) fn validate_buckets(buckets: &[u64]) -> Result<()> {
    if buckets.is_empty() {
        return Err(GatewatchError::Config("latency buckets must not be empty".into()));
    }
    if buckets.windows(2).any(|w| w[0] >= w[1]) {
        return Err(GatewatchError::Config(
            "latency buckets must be strictly increasing".into(),
        ));
    }
    Ok(())
}

fn validate_spec(spec: &MetricSpec) -> Result<()> {
    if !valid_metric_name(spec.name) {
        return Err(GatewatchError::Config(format!("invalid metric name: {:?}", spec.name)));
    }
    for (i, l) in spec.labels.iter().enumerate() {
        if !valid_label_name(l) {
            return Err(GatewatchError::Config(format!(
                "metric {}: invalid label name {:?}",
                spec.name, l
            )));
        }
        if spec.kind == MetricKind::Histogram && *l == "le" {
            return Err(GatewatchError::Config(format!(
                "metric {}: label \"le\" is reserved for histograms",
                spec.name
            )));
        }
        if spec.labels[..i].contains(l) {
            return Err(GatewatchError::Config(format!(
                "metric {}: duplicate label {:?}",
                spec.name, l
            )));
        }
    }
    Ok(())
}

fn valid_metric_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

fn valid_label_name(s: &str) -> bool {
    if s.starts_with("__") {
        return false;
    }
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
