//! Request-scoped context shared across pipeline stages.
//!
//! `RequestContext` carries the route classification and arrival time, plus
//! the signal mailbox protective stages use to report outcomes without
//! depending on the metrics stage.

pub mod mailbox;
pub mod request;

pub use mailbox::{SignalHandler, SignalMailbox};
pub use request::RequestContext;
