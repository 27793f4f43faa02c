//! Shared error type across gatewatch crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed request.
    BadRequest,
    /// Nothing answered the request.
    NotFound,
    /// Payload too large.
    PayloadTooLarge,
    /// Rejected by admission control.
    TooManyRequests,
    /// Upstream or downstream stage failed.
    BadGateway,
    /// Gateway is draining or a dependency is down.
    Unavailable,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::NotFound => "NOT_FOUND",
            ClientCode::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ClientCode::TooManyRequests => "TOO_MANY_REQUESTS",
            ClientCode::BadGateway => "BAD_GATEWAY",
            ClientCode::Unavailable => "UNAVAILABLE",
            ClientCode::Internal => "INTERNAL",
        }
    }

    /// HTTP status the transport answers with.
    pub fn http_status(self) -> u16 {
        match self {
            ClientCode::BadRequest => 400,
            ClientCode::NotFound => 404,
            ClientCode::PayloadTooLarge => 413,
            ClientCode::TooManyRequests => 429,
            ClientCode::BadGateway => 502,
            ClientCode::Unavailable => 503,
            ClientCode::Internal => 500,
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, GatewatchError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum GatewatchError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("payload too large")]
    PayloadTooLarge,
    #[error("too many requests")]
    TooManyRequests,
    #[error("upstream failed: {0}")]
    Upstream(String),
    #[error("unavailable: {0}")]
    Unavailable(String),
    /// Startup-time misconfiguration. Never produced on a request path.
    #[error("config: {0}")]
    Config(String),
    #[error("unknown metric: {0}")]
    UnknownMetric(String),
    #[error("metric {name} expects {expected} label values, sink has {actual}")]
    LabelArity {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("internal: {0}")]
    Internal(String),
}

impl GatewatchError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            GatewatchError::BadRequest(_) => ClientCode::BadRequest,
            GatewatchError::NotFound(_) => ClientCode::NotFound,
            GatewatchError::PayloadTooLarge => ClientCode::PayloadTooLarge,
            GatewatchError::TooManyRequests => ClientCode::TooManyRequests,
            GatewatchError::Upstream(_) => ClientCode::BadGateway,
            GatewatchError::Unavailable(_) => ClientCode::Unavailable,
            GatewatchError::Config(_)
            | GatewatchError::UnknownMetric(_)
            | GatewatchError::LabelArity { .. }
            | GatewatchError::Internal(_) => ClientCode::Internal,
        }
    }

    /// True for errors that can only come out of startup wiring.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            GatewatchError::Config(_)
                | GatewatchError::UnknownMetric(_)
                | GatewatchError::LabelArity { .. }
        )
    }
}
