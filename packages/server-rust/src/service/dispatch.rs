//! Innermost dispatch service: runs [`Registry::execute`] off the async runtime.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{self, Poll};

use anyhow::anyhow;
use kairpc_core::{Context, Registry, ResultEnvelope};
use tower::Service;

use super::error::ServeError;
use crate::network::ShutdownController;

// ---------------------------------------------------------------------------
// DispatchService
// ---------------------------------------------------------------------------

/// `tower::Service<Context>` over a shared, fully populated [`Registry`].
///
/// Registered callables are synchronous and may block, so each call runs on
/// tokio's blocking pool. The call is admitted through the shutdown
/// controller and its [`DispatchGuard`](crate::network::DispatchGuard) is
/// dropped only when the callable returns, so dropping the returned future
/// does not end the dispatch early for drain purposes.
#[derive(Debug, Clone)]
pub struct DispatchService {
    registry: Arc<Registry>,
    shutdown: Arc<ShutdownController>,
}

impl DispatchService {
    #[must_use]
    pub fn new(registry: Arc<Registry>, shutdown: Arc<ShutdownController>) -> Self {
        Self { registry, shutdown }
    }
}

impl Service<Context> for DispatchService {
    type Response = ResultEnvelope;
    type Error = ServeError;
    type Future = Pin<Box<dyn Future<Output = Result<ResultEnvelope, ServeError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, ctx: Context) -> Self::Future {
        let Some(guard) = self.shutdown.begin_dispatch() else {
            return Box::pin(async { Err(ServeError::ShuttingDown) });
        };
        let registry = Arc::clone(&self.registry);
        Box::pin(async move {
            let result = tokio::task::spawn_blocking(move || {
                let _guard = guard;
                registry.execute(&ctx)
            })
            .await
            .map_err(|e| anyhow!("dispatch task failed: {e}"))?;
            Ok(result?)
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
