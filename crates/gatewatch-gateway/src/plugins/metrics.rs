//! Metrics stage.
//!
//! Per request: count traffic at entry, install signal handlers for every
//! protective mechanism, delegate to the rest of the chain, count a chain
//! failure, then hand latency recording to the completion detector. The
//! chain's result is returned untouched.

use std::sync::Arc;

use async_trait::async_trait;

use gatewatch_core::error::Result;
use gatewatch_core::names::{
    EXECUTE_LATENCY_MILLIS, EXECUTE_LATENCY_PATH_MILLIS, REQUEST_THROW_TOTAL, REQUEST_TOTAL,
    REQUEST_TYPE_TOTAL,
};
use gatewatch_core::{Mechanism, Outcome};

use super::order;
use crate::context::RequestContext;
use crate::obs::{ensure_arity, SharedSink};
use crate::pipeline::{Completion, Exchange, Plugin, PluginChain};

pub struct MetricsPlugin {
    sink: SharedSink,
}

impl MetricsPlugin {
    /// Fails if the sink does not know a metric this stage emits, or knows it
    /// with a different label arity.
    pub fn new(sink: SharedSink) -> Result<Self> {
        let fixed = [
            (REQUEST_TOTAL, 0),
            (REQUEST_TYPE_TOTAL, 2),
            (REQUEST_THROW_TOTAL, 0),
            (EXECUTE_LATENCY_MILLIS, 0),
            (EXECUTE_LATENCY_PATH_MILLIS, 1),
        ];
        for (name, arity) in fixed {
            ensure_arity(sink.as_ref(), name, arity)?;
        }
        for m in Mechanism::ALL {
            for outcome in [Outcome::TooManyRequests, Outcome::InternalError] {
                if let Some(name) = m.counter_for(outcome) {
                    ensure_arity(sink.as_ref(), name, 0)?;
                }
            }
        }
        Ok(Self { sink })
    }

    fn install_signals(&self, ctx: &mut RequestContext) {
        for mechanism in Mechanism::ALL {
            let sink = Arc::clone(&self.sink);
            ctx.install(mechanism, move |outcome| {
                if let Some(counter) = mechanism.counter_for(outcome) {
                    sink.inc_counter(counter, &[]);
                }
            });
        }
    }
}

#[async_trait]
impl Plugin for MetricsPlugin {
    fn name(&self) -> &'static str {
        "metrics"
    }

    fn order(&self) -> i32 {
        order::METRICS
    }

    async fn execute(&self, exchange: &mut Exchange, chain: PluginChain<'_>) -> Result<()> {
        self.sink.inc_counter(REQUEST_TOTAL, &[]);

        let ctx = exchange.context_mut();
        self.sink
            .inc_counter(REQUEST_TYPE_TOTAL, &[ctx.route_path(), ctx.rpc_type()]);
        let started_at = ctx.mark_started();
        self.install_signals(ctx);

        let completion = Completion::new(
            Arc::clone(&self.sink),
            started_at,
            ctx.route_path().to_string(),
        );

        let result = chain.execute(exchange).await;
        if let Err(e) = &result {
            self.sink.inc_counter(REQUEST_THROW_TOTAL, &[]);
            tracing::debug!(error = %e, "downstream chain failed");
        }

        completion.settle(exchange.response_mut());
        result
    }
}
