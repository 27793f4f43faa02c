//! HTTP transport.
//!
//! Responsibilities:
//! - Build the request context (route path, rpc type, arrival time)
//! - Buffer the request body up to `gateway.max_body_bytes`
//! - Run the pipeline and map a chain error onto the same response
//! - Commit the response (runs before-commit hooks) and hand it to hyper

use axum::{
    body::Body,
    extract::{Request, State},
    http::header,
    response::Response,
};
use tokio::time::Instant;
use tracing::Instrument;

use gatewatch_core::error::GatewatchError;

use crate::app_state::AppState;
use crate::context::RequestContext;
use crate::pipeline::{Exchange, RequestHead, ResponseBody, ServerResponse};

pub async fn handle(State(app): State<AppState>, req: Request) -> Response {
    let started_at = Instant::now();
    let (parts, body) = req.into_parts();

    let path = parts.uri.path().to_string();
    let rpc_type = app.cfg().rpc_type_for(&path).to_string();
    let span = tracing::info_span!(
        "request",
        method = %parts.method,
        path = %path,
        rpc_type = %rpc_type
    );

    async move {
        let limit = app.cfg().gateway.max_body_bytes;
        if declared_len(&parts.headers).is_some_and(|n| n > limit) {
            return reject(GatewatchError::PayloadTooLarge);
        }
        let body = match axum::body::to_bytes(body, limit).await {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!(error = %e, "request body read failed");
                return reject(GatewatchError::BadRequest(format!("read body failed: {e}")));
            }
        };

        let ctx = RequestContext::new(path, rpc_type).with_start(started_at);
        let mut exchange = Exchange::new(ctx).with_request(RequestHead {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
        });

        if let Err(e) = app.pipeline().execute(&mut exchange).await {
            tracing::debug!(error = %e, "pipeline failed");
            if !exchange.response_mut().fail(&e) {
                tracing::warn!(
                    error = %e,
                    status = exchange.response().status().as_u16(),
                    "pipeline failed after the response was committed"
                );
            }
        }

        let response = commit_into_response(exchange.into_response());
        tracing::debug!(status = response.status().as_u16(), "response committed");
        response
    }
    .instrument(span)
    .await
}

/// Commit `response` (running its before-commit hooks) and convert it into
/// an axum response. Streamed bodies keep flowing after this returns.
pub fn commit_into_response(mut response: ServerResponse) -> Response {
    response.commit();
    let (status, headers, body) = response.into_parts();
    let body = match body {
        ResponseBody::Empty => Body::empty(),
        ResponseBody::Full(b) => Body::from(b),
        ResponseBody::Stream(s) => Body::from_stream(s),
    };
    let mut out = Response::new(body);
    *out.status_mut() = status;
    *out.headers_mut() = headers;
    out
}

fn reject(err: GatewatchError) -> Response {
    let mut response = ServerResponse::new();
    response.fail(&err);
    commit_into_response(response)
}

fn declared_len(headers: &axum::http::HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}
