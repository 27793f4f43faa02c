//! gatewatch facade.
//!
//! Protective plugins usually only need [`core`] (mechanisms, outcomes and
//! the metric catalog). Embedders that assemble their own gateway pull the
//! pipeline, sinks and router from [`gateway`].

pub mod core {
    pub use gatewatch_core::*;
}

pub mod gateway {
    pub use gatewatch_gateway::*;
}
