//! Metrics stage behavior through a real pipeline, on a paused clock.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use gatewatch_core::names::*;
use gatewatch_core::{GatewatchError, Mechanism, Outcome};
use gatewatch_gateway::obs::{MetricSink, MetricsRegistry, NoopSink, SharedSink};
use gatewatch_gateway::pipeline::Plugin;
use gatewatch_gateway::plugins::MetricsPlugin;

use plugin_support::*;

const PROTECTIVE_COUNTERS: [&str; 6] = [
    SENTINEL_REQUEST_RESTRICT_TOTAL,
    SENTINEL_REQUEST_CIRCUITBREAKER_TOTAL,
    RESILIENCE4J_REQUEST_RESTRICT_TOTAL,
    RESILIENCE4J_REQUEST_CIRCUITBREAKER_TOTAL,
    HYSTRIX_REQUEST_CIRCUITBREAKER_TOTAL,
    RATELIMITER_REQUEST_RESTRICT_TOTAL,
];

fn assert_no_protective(reg: &MetricsRegistry) {
    for name in PROTECTIVE_COUNTERS {
        assert_eq!(counter(reg, name, &[]), 0, "metric={name}");
    }
}

#[tokio::test(start_paused = true)]
async fn buffered_request_counts_once_and_records_latency() {
    let reg = registry();
    let p = pipeline(&reg, vec![Respond::after(42)]);

    let mut ex = exchange("/order/findById", "http");
    p.execute(&mut ex).await.unwrap();
    ex.response_mut().commit();

    assert_eq!(counter(&reg, REQUEST_TOTAL, &[]), 1);
    assert_eq!(counter(&reg, REQUEST_TYPE_TOTAL, &["/order/findById", "http"]), 1);
    assert_eq!(counter(&reg, REQUEST_THROW_TOTAL, &[]), 0);

    let (count, sum) = latency(&reg, EXECUTE_LATENCY_MILLIS, &[]);
    assert_eq!(count, 1);
    assert!((42..=43).contains(&sum), "latency={sum}");

    let (count, sum) = latency(&reg, EXECUTE_LATENCY_PATH_MILLIS, &["/order/findById"]);
    assert_eq!(count, 1);
    assert!((42..=43).contains(&sum), "latency={sum}");

    assert_no_protective(&reg);
}

#[tokio::test(start_paused = true)]
async fn failed_chain_counts_throw_and_passes_error_through() {
    let reg = registry();
    let p = pipeline(&reg, vec![Fail::after(7)]);

    let mut ex = exchange("/order/save", "http");
    let err = p.execute(&mut ex).await.expect_err("chain must fail");
    assert!(matches!(err, GatewatchError::Upstream(_)));

    ex.response_mut().fail(&err);
    ex.response_mut().commit();

    assert_eq!(counter(&reg, REQUEST_TOTAL, &[]), 1);
    assert_eq!(counter(&reg, REQUEST_TYPE_TOTAL, &["/order/save", "http"]), 1);
    assert_eq!(counter(&reg, REQUEST_THROW_TOTAL, &[]), 1);
    assert_eq!(latency(&reg, EXECUTE_LATENCY_MILLIS, &[]).0, 1);
    assert_eq!(latency(&reg, EXECUTE_LATENCY_PATH_MILLIS, &["/order/save"]).0, 1);
}

#[tokio::test(start_paused = true)]
async fn rate_limiter_rejection_is_counted_and_timed() {
    let reg = registry();
    let p = pipeline(&reg, vec![Report::reject(Mechanism::RateLimiter), Respond::after(100)]);

    let mut ex = exchange("/order/findById", "http");
    p.execute(&mut ex).await.unwrap();
    assert_eq!(ex.response().status().as_u16(), 429);
    ex.response_mut().commit();

    assert_eq!(counter(&reg, RATELIMITER_REQUEST_RESTRICT_TOTAL, &[]), 1);
    assert_eq!(counter(&reg, REQUEST_TOTAL, &[]), 1);
    assert_eq!(counter(&reg, REQUEST_TYPE_TOTAL, &["/order/findById", "http"]), 1);
    assert_eq!(counter(&reg, REQUEST_THROW_TOTAL, &[]), 0);

    let (count, sum) = latency(&reg, EXECUTE_LATENCY_MILLIS, &[]);
    assert_eq!(count, 1);
    assert!(sum < 100, "rejected request never reached the slow terminal");
}

#[tokio::test(start_paused = true)]
async fn repeated_reports_each_count() {
    let reg = registry();
    let p = pipeline(
        &reg,
        vec![
            Report::pass(Mechanism::Resilience4j, Outcome::TooManyRequests, 3),
            Respond::after(1),
        ],
    );

    let mut ex = exchange("/a", "grpc");
    p.execute(&mut ex).await.unwrap();

    assert_eq!(counter(&reg, RESILIENCE4J_REQUEST_RESTRICT_TOTAL, &[]), 3);
    assert_eq!(counter(&reg, REQUEST_TOTAL, &[]), 1);
}

#[tokio::test(start_paused = true)]
async fn raw_429_report_counts_as_restrict() {
    let reg = registry();
    let p = pipeline(
        &reg,
        vec![
            Report::pass(Mechanism::RateLimiter, Outcome::Other(429), 2),
            Report::pass(Mechanism::Sentinel, Outcome::Other(500), 1),
            Respond::after(1),
        ],
    );
    let mut ex = exchange("/a", "http");
    p.execute(&mut ex).await.unwrap();

    assert_eq!(counter(&reg, RATELIMITER_REQUEST_RESTRICT_TOTAL, &[]), 2);
    assert_eq!(counter(&reg, SENTINEL_REQUEST_CIRCUITBREAKER_TOTAL, &[]), 1);
}

#[tokio::test(start_paused = true)]
async fn breaker_outcomes_map_per_mechanism() {
    let reg = registry();
    let p = pipeline(
        &reg,
        vec![
            Report::pass(Mechanism::Hystrix, Outcome::InternalError, 1),
            Respond::after(1),
        ],
    );
    let mut ex = exchange("/a", "http");
    p.execute(&mut ex).await.unwrap();

    assert_eq!(counter(&reg, HYSTRIX_REQUEST_CIRCUITBREAKER_TOTAL, &[]), 1);
    assert_eq!(counter(&reg, SENTINEL_REQUEST_CIRCUITBREAKER_TOTAL, &[]), 0);
}

#[tokio::test(start_paused = true)]
async fn untracked_outcomes_count_nothing() {
    let reg = registry();
    let p = pipeline(
        &reg,
        vec![
            Report::pass(Mechanism::RateLimiter, Outcome::Other(418), 2),
            Report::pass(Mechanism::Hystrix, Outcome::TooManyRequests, 1),
            Respond::after(1),
        ],
    );
    let mut ex = exchange("/a", "http");
    p.execute(&mut ex).await.unwrap();

    assert_no_protective(&reg);
    assert_eq!(counter(&reg, METRICS_DROPPED_TOTAL, &["unknown"]), 0);
}

#[tokio::test(start_paused = true)]
async fn streamed_response_is_timed_at_commit() {
    let reg = registry();
    let p = pipeline(&reg, vec![Streaming::after(10)]);

    let mut ex = exchange("/stream", "http");
    p.execute(&mut ex).await.unwrap();

    // handler returned at t=10ms; nothing recorded until the transport commits
    assert_eq!(latency(&reg, EXECUTE_LATENCY_MILLIS, &[]).0, 0);
    assert_eq!(ex.response().pending_hooks(), 1);

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(ex.response_mut().commit());

    let (count, sum) = latency(&reg, EXECUTE_LATENCY_MILLIS, &[]);
    assert_eq!(count, 1);
    assert!((50..=51).contains(&sum), "latency={sum}");
}

#[tokio::test(start_paused = true)]
async fn committed_before_settle_is_timed_at_settle() {
    let reg = registry();
    let early: Arc<dyn Plugin> = Arc::new(CommitEarly {
        commit_at: Duration::from_millis(20),
        return_at: Duration::from_millis(60),
    });
    let p = pipeline(&reg, vec![early]);

    let mut ex = exchange("/early", "http");
    p.execute(&mut ex).await.unwrap();

    // already committed when the chain settled: recorded on the spot
    let (count, sum) = latency(&reg, EXECUTE_LATENCY_MILLIS, &[]);
    assert_eq!(count, 1);
    assert!((60..=61).contains(&sum), "latency={sum}");

    assert!(!ex.response_mut().commit());
    assert_eq!(latency(&reg, EXECUTE_LATENCY_MILLIS, &[]).0, 1);
}

#[tokio::test(start_paused = true)]
async fn dropped_before_commit_records_no_latency() {
    let reg = registry();
    let p = pipeline(&reg, vec![Streaming::after(5)]);

    let mut ex = exchange("/gone", "http");
    p.execute(&mut ex).await.unwrap();
    drop(ex);

    assert_eq!(counter(&reg, REQUEST_TOTAL, &[]), 1);
    assert_eq!(latency(&reg, EXECUTE_LATENCY_MILLIS, &[]).0, 0);
}

#[tokio::test(start_paused = true)]
async fn cancelled_chain_records_no_latency() {
    let reg = registry();
    let p = pipeline(&reg, vec![Respond::after(1_000)]);

    let mut ex = exchange("/slow", "http");
    let res = tokio::time::timeout(Duration::from_millis(10), p.execute(&mut ex)).await;
    assert!(res.is_err(), "chain should still be running");

    assert_eq!(counter(&reg, REQUEST_TOTAL, &[]), 1);
    ex.response_mut().commit();
    assert_eq!(latency(&reg, EXECUTE_LATENCY_MILLIS, &[]).0, 0);
}

#[tokio::test(start_paused = true)]
async fn concurrent_requests_share_the_sink() {
    let reg = registry();
    let p = Arc::new(pipeline(&reg, vec![Respond::after(3)]));

    let mut tasks = Vec::new();
    for i in 0..16 {
        let p = Arc::clone(&p);
        tasks.push(tokio::spawn(async move {
            let path = if i % 2 == 0 { "/even" } else { "/odd" };
            let mut ex = exchange(path, "http");
            p.execute(&mut ex).await.unwrap();
            ex.response_mut().commit();
        }));
    }
    for t in tasks {
        t.await.unwrap();
    }

    assert_eq!(counter(&reg, REQUEST_TOTAL, &[]), 16);
    assert_eq!(counter(&reg, REQUEST_TYPE_TOTAL, &["/even", "http"]), 8);
    assert_eq!(counter(&reg, REQUEST_TYPE_TOTAL, &["/odd", "http"]), 8);
    assert_eq!(latency(&reg, EXECUTE_LATENCY_MILLIS, &[]).0, 16);
}

#[tokio::test]
async fn upstream_start_time_is_respected() {
    let reg = registry();
    let p = pipeline(&reg, vec![Respond::after(0)]);

    let start = tokio::time::Instant::now();
    let ctx = gatewatch_gateway::context::RequestContext::new("/x", "http").with_start(start);
    let mut ex = gatewatch_gateway::pipeline::Exchange::new(ctx);
    p.execute(&mut ex).await.unwrap();

    assert_eq!(ex.context().started_at(), Some(start));
}

struct WrongArity;

impl MetricSink for WrongArity {
    fn inc_counter(&self, _name: &'static str, _labels: &[&str]) {}
    fn record_duration(&self, _name: &'static str, _labels: &[&str], _millis: u64) {}
    fn label_arity(&self, name: &str) -> Option<usize> {
        if name == REQUEST_TYPE_TOTAL {
            Some(1)
        } else {
            spec(name).map(|s| s.arity())
        }
    }
}

#[test]
fn arity_mismatch_fails_at_construction() {
    let sink: SharedSink = Arc::new(WrongArity);
    let err = MetricsPlugin::new(sink).err().expect("must fail");
    assert!(err.is_config());
    assert!(matches!(err, GatewatchError::LabelArity { expected: 2, actual: 1, .. }));
}

#[test]
fn missing_metric_fails_at_construction() {
    let reg = MetricsRegistry::builder()
        .register(*spec(REQUEST_TOTAL).unwrap())
        .build()
        .unwrap();
    let sink: SharedSink = Arc::new(reg);
    let err = MetricsPlugin::new(sink).err().expect("must fail");
    assert!(matches!(err, GatewatchError::UnknownMetric(_)));
}

#[test]
fn noop_sink_passes_startup_checks() {
    let sink: SharedSink = Arc::new(NoopSink);
    assert!(MetricsPlugin::new(sink).is_ok());
}
