use tokio::time::Instant;

use gatewatch_core::{Mechanism, Outcome};

use super::mailbox::SignalMailbox;

/// Per-request attribute bag.
///
/// Created by the transport when a request enters the pipeline and dropped
/// with the request. Owned by one request's task, so nothing here is
/// synchronized.
#[derive(Debug)]
pub struct RequestContext {
    /// Raw URI path.
    route_path: String,
    /// Protocol/backend classification (e.g. `http`, `grpc`, `dubbo`).
    rpc_type: String,
    started_at: Option<Instant>,
    mailbox: SignalMailbox,
}

impl RequestContext {
    pub fn new(route_path: impl Into<String>, rpc_type: impl Into<String>) -> Self {
        Self {
            route_path: route_path.into(),
            rpc_type: rpc_type.into(),
            started_at: None,
            mailbox: SignalMailbox::new(),
        }
    }

    /// Arrival time stamped at the edge.
    pub fn with_start(mut self, at: Instant) -> Self {
        self.started_at = Some(at);
        self
    }

    pub fn route_path(&self) -> &str {
        &self.route_path
    }

    pub fn rpc_type(&self) -> &str {
        &self.rpc_type
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// Arrival time, stamping `now` if nothing upstream did.
    pub fn mark_started(&mut self) -> Instant {
        *self.started_at.get_or_insert_with(Instant::now)
    }

    pub fn mailbox(&self) -> &SignalMailbox {
        &self.mailbox
    }

    pub fn install<F>(&mut self, mechanism: Mechanism, handler: F) -> bool
    where
        F: Fn(Outcome) + Send + Sync + 'static,
    {
        self.mailbox.install(mechanism, handler)
    }

    /// Called by protective stages. No-op when nothing is installed.
    pub fn report(&self, mechanism: Mechanism, outcome: Outcome) -> bool {
        self.mailbox.report(mechanism, outcome)
    }
}
