//! Dispatch pipeline.
//!
//! 1. **Dispatch** (`dispatch`): `Context` -> `ResultEnvelope` via the core registry
//! 2. **Middleware** (`middleware`): Tower layers (metrics, load-shedding)

pub mod config;
pub mod dispatch;
pub mod error;
pub mod middleware;

pub use config::ServerConfig;
pub use dispatch::DispatchService;
pub use error::ServeError;
pub use middleware::{build_dispatch_pipeline, DispatchPipeline};
