//! Plugin pipeline.
//!
//! Re-exports the chain, the exchange model and the completion detector so
//! plugins can depend on this module directly.

pub mod chain;
pub mod completion;
pub mod exchange;

pub use chain::{Pipeline, Plugin, PluginChain};
pub use completion::{Completion, Settled};
pub use exchange::{BeforeCommit, Exchange, RequestHead, ResponseBody, ServerResponse};
