//! Request/response exchange carried through the plugin chain.
//!
//! The response tracks whether it has been committed (status and headers
//! handed to the client). Hooks registered with
//! [`ServerResponse::before_commit`] run exactly once, at the moment of
//! commit; a response dropped before commit drops its hooks unrun.

use std::fmt;

use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use bytes::Bytes;
use futures_util::stream::BoxStream;
use serde_json::{json, Value};

use gatewatch_core::error::{GatewatchError, Result};

use crate::context::RequestContext;

/// One-shot hook run when the response commits.
pub type BeforeCommit = Box<dyn FnOnce() + Send>;

/// Inbound request as seen by plugins (body already buffered).
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Default for RequestHead {
    fn default() -> Self {
        Self {
            method: Method::GET,
            uri: Uri::from_static("/"),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }
}

pub enum ResponseBody {
    Empty,
    Full(Bytes),
    /// Chunks produced after commit.
    Stream(BoxStream<'static, Result<Bytes>>),
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Empty => f.write_str("Empty"),
            ResponseBody::Full(b) => write!(f, "Full({} bytes)", b.len()),
            ResponseBody::Stream(_) => f.write_str("Stream"),
        }
    }
}

pub struct ServerResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: ResponseBody,
    committed: bool,
    hooks: Vec<BeforeCommit>,
}

impl Default for ServerResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerResponse {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: ResponseBody::Empty,
            committed: false,
            hooks: Vec::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Returns false (and changes nothing) once committed.
    pub fn set_status(&mut self, status: StatusCode) -> bool {
        if self.committed {
            return false;
        }
        self.status = status;
        true
    }

    /// Returns false (and changes nothing) once committed.
    pub fn insert_header(&mut self, name: header::HeaderName, value: HeaderValue) -> bool {
        if self.committed {
            return false;
        }
        self.headers.insert(name, value);
        true
    }

    /// The body may still be set after commit: a streamed body is produced
    /// after headers go out.
    pub fn set_body(&mut self, body: ResponseBody) {
        self.body = body;
    }

    /// Buffered JSON body with status.
    pub fn json(&mut self, status: StatusCode, value: &Value) -> bool {
        if !self.set_status(status) {
            return false;
        }
        self.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self.body = ResponseBody::Full(Bytes::from(value.to_string()));
        true
    }

    /// Turn a chain error into a client-visible response.
    pub fn fail(&mut self, err: &GatewatchError) -> bool {
        let code = err.client_code();
        let status =
            StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.json(
            status,
            &json!({
                "code": code.as_str(),
                "message": err.to_string(),
            }),
        )
    }

    /// Register a hook for the commit instant. Ignored (returns false) when
    /// the response is already committed.
    pub fn before_commit<F>(&mut self, hook: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if self.committed {
            return false;
        }
        self.hooks.push(Box::new(hook));
        true
    }

    /// Mark the response committed, running pending hooks in registration
    /// order. Only the first call has any effect.
    pub fn commit(&mut self) -> bool {
        if self.committed {
            return false;
        }
        for hook in self.hooks.drain(..) {
            hook();
        }
        self.committed = true;
        true
    }

    pub fn pending_hooks(&self) -> usize {
        self.hooks.len()
    }

    pub fn into_parts(self) -> (StatusCode, HeaderMap, ResponseBody) {
        (self.status, self.headers, self.body)
    }
}

impl fmt::Debug for ServerResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerResponse")
            .field("status", &self.status)
            .field("committed", &self.committed)
            .field("pending_hooks", &self.hooks.len())
            .field("body", &self.body)
            .finish()
    }
}

/// Everything one request carries through the chain.
#[derive(Debug)]
pub struct Exchange {
    request: RequestHead,
    context: RequestContext,
    response: ServerResponse,
}

impl Exchange {
    pub fn new(context: RequestContext) -> Self {
        Self {
            request: RequestHead::default(),
            context,
            response: ServerResponse::new(),
        }
    }

    pub fn with_request(mut self, request: RequestHead) -> Self {
        self.request = request;
        self
    }

    pub fn request(&self) -> &RequestHead {
        &self.request
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut RequestContext {
        &mut self.context
    }

    pub fn response(&self) -> &ServerResponse {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut ServerResponse {
        &mut self.response
    }

    pub fn into_response(self) -> ServerResponse {
        self.response
    }
}
