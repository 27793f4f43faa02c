//! gatewatch core: transport-agnostic contracts shared by the gateway and any
//! protective plugin that reports outcomes to the metrics stage.
//!
//! This crate defines the error surface, the metric catalog (names, kinds and
//! fixed label arities) and the closed set of protective mechanisms with their
//! typed outcomes. It carries no runtime or transport dependencies.
//!
//! # Panics
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Every fallible path surfaces as `GatewatchError`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod names;
pub mod signal;

/// Shared result type.
pub use error::{GatewatchError, Result};
pub use signal::{Mechanism, Outcome};
