//! HTTP handler definitions for the kairpc server.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and re-exports all handler functions for convenient access
//! when building the router.

pub mod health;
pub mod rpc;

pub use health::{health_handler, liveness_handler, readiness_handler};
pub use rpc::rpc_handler;

use std::sync::Arc;
use std::time::Instant;

use kairpc_core::Registry;

use super::{NetworkConfig, ShutdownController};
use crate::service::DispatchPipeline;

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Holds `Arc` references and a cloneable service stack so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// The populated registry, read-only while serving.
    pub registry: Arc<Registry>,
    /// Dispatch service stack (load shedding, metrics, blocking dispatch).
    pub dispatcher: DispatchPipeline,
    /// Graceful shutdown controller with health state and in-flight tracking.
    pub shutdown: Arc<ShutdownController>,
    pub config: Arc<NetworkConfig>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}
