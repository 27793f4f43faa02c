use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::json;

use gatewatch_core::error::Result;

use super::order;
use crate::pipeline::{Exchange, Plugin, PluginChain};

/// Terminal plugin: answers with a JSON description of the request.
/// Useful to prove the chain end to end without an upstream.
#[derive(Debug, Default)]
pub struct EchoPlugin;

impl EchoPlugin {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Plugin for EchoPlugin {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn order(&self) -> i32 {
        order::ECHO
    }

    async fn execute(&self, exchange: &mut Exchange, _chain: PluginChain<'_>) -> Result<()> {
        let body = json!({
            "method": exchange.request().method.as_str(),
            "path": exchange.context().route_path(),
            "rpc_type": exchange.context().rpc_type(),
            "body_bytes": exchange.request().body.len(),
        });
        exchange.response_mut().json(StatusCode::OK, &body);
        Ok(())
    }
}
