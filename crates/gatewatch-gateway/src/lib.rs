//! gatewatch gateway library entry.
//!
//! This crate wires the metric sinks, request context, plugin pipeline,
//! metrics stage, transport, and ops endpoints into a gateway process. It is
//! consumed by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod context;
pub mod obs;
pub mod ops;
pub mod pipeline;
pub mod plugins;
pub mod router;
pub mod transport;
