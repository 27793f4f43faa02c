//! Transport layer (HTTP).
//!
//! Turns inbound HTTP requests into pipeline exchanges and commits the
//! resulting responses.

pub mod http;
