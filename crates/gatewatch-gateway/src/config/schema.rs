use std::collections::HashSet;
use std::net::SocketAddr;

use serde::Deserialize;
use gatewatch_core::error::{GatewatchError, Result};

use crate::obs::metrics::{validate_buckets, DEFAULT_LATENCY_BUCKETS_MS};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub metrics: MetricsSection,

    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(GatewatchError::Config(format!(
                "unsupported config version: {}",
                self.version
            )));
        }

        self.gateway.validate()?;
        self.metrics.validate()?;

        let mut seen = HashSet::new();
        for r in &self.routes {
            r.validate()?;
            if !seen.insert(r.prefix.as_str()) {
                return Err(GatewatchError::Config(format!(
                    "duplicate route prefix: {}",
                    r.prefix
                )));
            }
        }
        Ok(())
    }

    /// Rpc type of the longest route prefix covering `path`, else the default.
    pub fn rpc_type_for(&self, path: &str) -> &str {
        self.routes
            .iter()
            .filter(|r| r.covers(path))
            .max_by_key(|r| r.prefix.len())
            .map(|r| r.rpc_type.as_str())
            .unwrap_or(self.gateway.default_rpc_type.as_str())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_rpc_type")]
    pub default_rpc_type: String,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            default_rpc_type: default_rpc_type(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        if self.default_rpc_type.trim().is_empty() {
            return Err(GatewatchError::Config(
                "gateway.default_rpc_type must not be empty".into(),
            ));
        }
        if !(1..=MAX_BODY_LIMIT).contains(&self.max_body_bytes) {
            return Err(GatewatchError::Config(format!(
                "gateway.max_body_bytes must be between 1 and {MAX_BODY_LIMIT}"
            )));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse::<SocketAddr>().map_err(|e| {
            GatewatchError::Config(format!("gateway.listen {:?} is not a socket address: {e}", self.listen))
        })
    }
}

const MAX_BODY_LIMIT: usize = 64 * 1024 * 1024;

fn default_listen() -> String {
    "0.0.0.0:9195".into()
}
fn default_rpc_type() -> String {
    "http".into()
}
fn default_max_body_bytes() -> usize {
    1024 * 1024
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_buckets")]
    pub latency_buckets_ms: Vec<u64>,

    /// 0 records in-process directly; otherwise the forwarding queue capacity.
    #[serde(default)]
    pub forward_queue: usize,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            latency_buckets_ms: default_buckets(),
            forward_queue: 0,
        }
    }
}

impl MetricsSection {
    pub fn validate(&self) -> Result<()> {
        validate_buckets(&self.latency_buckets_ms)?;
        if self.forward_queue > MAX_FORWARD_QUEUE {
            return Err(GatewatchError::Config(format!(
                "metrics.forward_queue must be at most {MAX_FORWARD_QUEUE}"
            )));
        }
        Ok(())
    }
}

const MAX_FORWARD_QUEUE: usize = 1_000_000;

fn default_enabled() -> bool {
    true
}
fn default_buckets() -> Vec<u64> {
    DEFAULT_LATENCY_BUCKETS_MS.to_vec()
}

/// Path prefix -> rpc type classification.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteConfig {
    pub prefix: String,
    pub rpc_type: String,
}

impl RouteConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.prefix.starts_with('/') {
            return Err(GatewatchError::Config(format!(
                "route prefix must start with '/': {}",
                self.prefix
            )));
        }
        if self.rpc_type.trim().is_empty() {
            return Err(GatewatchError::Config(format!(
                "route {} has an empty rpc_type",
                self.prefix
            )));
        }
        Ok(())
    }

    /// Segment-aware: `/order` covers `/order` and `/order/x`, not `/orders`.
    pub fn covers(&self, path: &str) -> bool {
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || self.prefix.ends_with('/') || rest.starts_with('/'),
            None => false,
        }
    }
}
