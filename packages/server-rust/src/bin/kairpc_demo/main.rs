//! Demo server exposing a [`Manager`] both as object `manager` and as plain
//! operations.
//!
//! ```bash
//! RUST_LOG=kairpc=debug cargo run --bin kairpc-demo
//! curl -s localhost:9302/__kairpc_endpoint -H 'kairpc-session: s1' \
//!     -d '{"fn":"register","p":["alice"]}'
//! ```

mod manager;

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use kairpc_core::{Context, Registry, Value};
use kairpc_server::logging;
use kairpc_server::{NetworkModule, ServerArgs};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

use manager::Manager;

fn build_registry(manager: &Arc<Manager>) -> anyhow::Result<Registry> {
    let mut registry = Registry::new();

    let m = Arc::clone(manager);
    registry.register_operation("ping", move |ctx: Context| {
        BTreeMap::from([
            ("session".to_string(), Value::from(ctx.session())),
            ("users".to_string(), Value::from(u32::try_from(m.user_count()).unwrap_or(u32::MAX))),
        ])
    })?;

    let m = Arc::clone(manager);
    registry.register_operation("register", move |username: String| m.register(&username))?;
    let m = Arc::clone(manager);
    registry.register_operation("login", move |ctx: Context, username: String| {
        m.login(&ctx, &username)
    })?;
    let m = Arc::clone(manager);
    registry.register_operation("getStore", move |ctx: Context| m.get_store(&ctx))?;
    let m = Arc::clone(manager);
    registry.register_operation("setStore", move |ctx: Context, value: String| {
        m.set_store(&ctx, value)
    })?;
    let m = Arc::clone(manager);
    registry.register_operation("details", move |ctx: Context| m.details(&ctx))?;
    let m = Arc::clone(manager);
    registry.register_operation("push", move |ctx: Context, value: String| m.push(&ctx, value))?;
    let m = Arc::clone(manager);
    registry.register_operation("pop", move |ctx: Context| m.pop(&ctx))?;

    registry.register_object("manager", Arc::clone(manager))?;
    Ok(registry)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();
    logging::init(args.log_format)?;

    if let Some(addr) = args.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("failed to install Prometheus exporter")?;
        info!(%addr, "metrics exporter listening");
    }

    let manager = Arc::new(Manager::default());
    let registry = build_registry(&manager).context("failed to build registry")?;

    let mut network = NetworkModule::new(
        args.network_config(),
        args.server_config(),
        Arc::new(registry),
    );
    let port = network.start().await?;
    info!(port, "kairpc demo ready");

    network.serve(shutdown_signal()).await
}
