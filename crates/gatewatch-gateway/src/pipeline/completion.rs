//! Completion detection for latency recording.
//!
//! When the chain settles, the response is either already committed (record
//! now) or not yet (record from a before-commit hook, which captures the time
//! a streamed response actually reaches the client). A per-request atomic
//! flag makes the recording happen at most once whichever path fires.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::time::Instant;

use gatewatch_core::names::{EXECUTE_LATENCY_MILLIS, EXECUTE_LATENCY_PATH_MILLIS};

use super::exchange::ServerResponse;
use crate::obs::SharedSink;

/// Which completion path a settle took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    /// Response was committed already; latency recorded on the spot.
    Immediate,
    /// Latency will be recorded when the response commits.
    Deferred,
}

#[derive(Clone)]
pub struct Completion {
    inner: Arc<Inner>,
}

struct Inner {
    sink: SharedSink,
    started_at: Instant,
    route_path: String,
    fired: AtomicBool,
}

impl Completion {
    pub fn new(sink: SharedSink, started_at: Instant, route_path: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                sink,
                started_at,
                route_path: route_path.into(),
                fired: AtomicBool::new(false),
            }),
        }
    }

    /// Hook completion to the response's commit state.
    pub fn settle(&self, response: &mut ServerResponse) -> Settled {
        if response.is_committed() {
            self.fire();
            return Settled::Immediate;
        }
        let this = self.clone();
        response.before_commit(move || {
            this.fire();
        });
        Settled::Deferred
    }

    /// Record latency. Returns false if this request was already recorded.
    pub fn fire(&self) -> bool {
        if self.inner.fired.swap(true, Ordering::AcqRel) {
            tracing::debug!(path = %self.inner.route_path, "completion already fired");
            return false;
        }
        let elapsed = self.inner.started_at.elapsed().as_millis();
        let millis = u64::try_from(elapsed).unwrap_or(u64::MAX);

        let sink = &self.inner.sink;
        sink.record_duration(EXECUTE_LATENCY_MILLIS, &[], millis);
        sink.record_duration(EXECUTE_LATENCY_PATH_MILLIS, &[self.inner.route_path.as_str()], millis);

        tracing::debug!(path = %self.inner.route_path, elapsed_ms = millis, "latency recorded");
        true
    }

    pub fn has_fired(&self) -> bool {
        self.inner.fired.load(Ordering::Acquire)
    }
}
