//! Shared application state for the gatewatch gateway.
//!
//! Builds the metric registry, picks the sink, and assembles the plugin
//! pipeline. Startup errors are returned, never panicked.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gatewatch_core::error::{GatewatchError, Result};

use crate::config::GatewayConfig;
use crate::obs::{ForwardingSink, MetricsRegistry, NoopSink, SharedSink};
use crate::pipeline::{Pipeline, Plugin};
use crate::plugins::{EchoPlugin, MetricsPlugin};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    registry: Arc<MetricsRegistry>,
    sink: SharedSink,
    pipeline: Pipeline,
    draining: AtomicBool,
}

impl AppState {
    /// Build application state with the built-in plugins only.
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        Self::with_plugins(cfg, Vec::new())
    }

    /// Build application state, adding `extra` plugins (protective stages,
    /// custom terminals) to the built-in ones.
    ///
    /// Must run inside a tokio runtime when `metrics.forward_queue > 0`.
    pub fn with_plugins(cfg: GatewayConfig, extra: Vec<Arc<dyn Plugin>>) -> Result<Self> {
        // 1) Registry + sink
        let registry = Arc::new(MetricsRegistry::with_catalog(
            cfg.metrics.latency_buckets_ms.clone(),
        )?);

        let sink: SharedSink = if !cfg.metrics.enabled {
            Arc::new(NoopSink)
        } else if cfg.metrics.forward_queue > 0 {
            let rt = tokio::runtime::Handle::try_current().map_err(|_| {
                GatewatchError::Config("metrics.forward_queue requires a tokio runtime".into())
            })?;
            let (sink, forwarder) =
                ForwardingSink::new(Arc::clone(&registry), cfg.metrics.forward_queue);
            rt.spawn(forwarder.run());
            Arc::new(sink)
        } else {
            registry.clone()
        };

        // 2) Plugins
        let mut plugins: Vec<Arc<dyn Plugin>> = Vec::with_capacity(extra.len() + 2);
        if cfg.metrics.enabled {
            plugins.push(Arc::new(MetricsPlugin::new(Arc::clone(&sink))?));
        }
        plugins.extend(extra);
        plugins.push(Arc::new(EchoPlugin::new()));

        let pipeline = Pipeline::new(plugins);
        tracing::info!(
            plugins = ?pipeline.names(),
            metrics = cfg.metrics.enabled,
            forward_queue = cfg.metrics.forward_queue,
            "pipeline assembled"
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                registry,
                sink,
                pipeline,
                draining: AtomicBool::new(false),
            }),
        })
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> &MetricsRegistry {
        &self.inner.registry
    }

    pub fn sink(&self) -> SharedSink {
        Arc::clone(&self.inner.sink)
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.inner.pipeline
    }

    /// Mark draining state.
    pub fn set_draining(&self) {
        self.inner.draining.store(true, Ordering::Relaxed);
    }

    /// Return whether draining is active.
    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Relaxed)
    }
}
