//! Pipeline composition: combines all middleware layers into a single service stack.

use std::sync::Arc;

use kairpc_core::Registry;
use tower::ServiceBuilder;

use super::load_shed::{LoadShedLayer, LoadShedService};
use super::metrics::{MetricsLayer, MetricsService};
use crate::service::config::ServerConfig;
use crate::network::ShutdownController;
use crate::service::dispatch::DispatchService;

/// The composed dispatch service stack.
pub type DispatchPipeline = LoadShedService<MetricsService<DispatchService>>;

/// Build the dispatch pipeline by wrapping a [`DispatchService`] with middleware layers.
///
/// Layer order (outermost to innermost):
/// 1. `LoadShedLayer` -- reject when overloaded (fail fast before doing any work)
/// 2. `MetricsLayer` -- record timing and outcome (closest to the actual dispatch)
///
/// The result is cheap to clone; all clones share the same concurrency limit
/// and the same shutdown controller.
#[must_use]
pub fn build_dispatch_pipeline(
    registry: Arc<Registry>,
    shutdown: Arc<ShutdownController>,
    config: &ServerConfig,
) -> DispatchPipeline {
    ServiceBuilder::new()
        .layer(LoadShedLayer::new(config.max_concurrent_dispatches))
        .layer(MetricsLayer)
        .service(DispatchService::new(registry, shutdown))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
