//! Built-in plugins.

pub mod echo;
pub mod metrics;

pub use echo::EchoPlugin;
pub use metrics::MetricsPlugin;

/// Plugin order slots. Lower runs first.
pub mod order {
    /// Observes everything after it, protective stages included.
    pub const METRICS: i32 = -100;
    /// Protective stages (rate limiting, circuit breaking) go here.
    pub const PROTECTIVE: i32 = 0;
    /// Terminal responder.
    pub const ECHO: i32 = 1_000;
}
