use std::sync::Arc;

use async_trait::async_trait;

use gatewatch_core::error::Result;

use super::exchange::Exchange;

/// A pipeline stage.
///
/// A plugin either answers the request itself or hands the exchange to the
/// rest of the chain via [`PluginChain::execute`].
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;

    /// Lower runs first.
    fn order(&self) -> i32;

    /// Skipped plugins are passed over without being executed.
    fn skip(&self, _exchange: &Exchange) -> bool {
        false
    }

    async fn execute(&self, exchange: &mut Exchange, chain: PluginChain<'_>) -> Result<()>;
}

/// Ordered plugin list, sorted once at construction.
#[derive(Default)]
pub struct Pipeline {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl Pipeline {
    pub fn new(mut plugins: Vec<Arc<dyn Plugin>>) -> Self {
        plugins.sort_by_key(|p| p.order());
        Self { plugins }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub async fn execute(&self, exchange: &mut Exchange) -> Result<()> {
        PluginChain::new(&self.plugins).execute(exchange).await
    }
}

/// Remainder of the chain from the point of view of the running plugin.
#[derive(Clone, Copy)]
pub struct PluginChain<'a> {
    rest: &'a [Arc<dyn Plugin>],
}

impl<'a> PluginChain<'a> {
    pub fn new(plugins: &'a [Arc<dyn Plugin>]) -> Self {
        Self { rest: plugins }
    }

    pub fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }

    /// Run the next non-skipped plugin. An exhausted chain settles Ok.
    pub async fn execute(self, exchange: &mut Exchange) -> Result<()> {
        let mut rest = self.rest;
        while let Some((plugin, tail)) = rest.split_first() {
            if plugin.skip(exchange) {
                tracing::trace!(plugin = plugin.name(), "plugin skipped");
                rest = tail;
                continue;
            }
            tracing::trace!(plugin = plugin.name(), "plugin executing");
            return plugin.execute(exchange, PluginChain { rest: tail }).await;
        }
        Ok(())
    }
}
