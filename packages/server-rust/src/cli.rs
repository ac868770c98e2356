//! Command-line and environment configuration.

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use kairpc_core::DEFAULT_ENDPOINT_PATH;

use crate::network::{normalize_endpoint_path, NetworkConfig, DEFAULT_SESSION_HEADER};
use crate::service::config::DEFAULT_MAX_CONCURRENT_DISPATCHES;
use crate::service::ServerConfig;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable compact lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Server options. Every flag can also be set through its `KAIRPC_*`
/// environment variable.
#[derive(Debug, Clone, Parser)]
#[command(name = "kairpc", about = "Serve a kairpc registry over HTTP", version)]
pub struct ServerArgs {
    /// Bind address
    #[arg(long, env = "KAIRPC_HOST", default_value = "localhost")]
    pub host: String,

    /// Port to listen on (0 picks a free port)
    #[arg(long, env = "KAIRPC_PORT", default_value_t = 9302)]
    pub port: u16,

    /// Route of the dispatch endpoint
    #[arg(long, env = "KAIRPC_ENDPOINT", default_value = DEFAULT_ENDPOINT_PATH)]
    pub endpoint: String,

    /// Request header carrying the session id
    #[arg(long, env = "KAIRPC_SESSION_HEADER", default_value = DEFAULT_SESSION_HEADER)]
    pub session_header: String,

    /// Allowed CORS origins, comma separated (`*` allows any)
    #[arg(
        long,
        env = "KAIRPC_CORS_ORIGINS",
        value_delimiter = ',',
        default_value = "*"
    )]
    pub cors_origins: Vec<String>,

    /// Request timeout in seconds
    #[arg(long, env = "KAIRPC_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Shutdown drain timeout in seconds
    #[arg(long, env = "KAIRPC_DRAIN_TIMEOUT_SECS", default_value_t = 30)]
    pub drain_timeout_secs: u64,

    /// Maximum concurrent dispatches before requests are shed (at most the
    /// blocking pool size)
    #[arg(
        long,
        env = "KAIRPC_MAX_CONCURRENT",
        default_value_t = DEFAULT_MAX_CONCURRENT_DISPATCHES
    )]
    pub max_concurrent_dispatches: u32,

    /// Address for the Prometheus scrape endpoint (disabled when unset)
    #[arg(long, env = "KAIRPC_METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,

    /// Log output format
    #[arg(long, env = "KAIRPC_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl ServerArgs {
    #[must_use]
    pub fn network_config(&self) -> NetworkConfig {
        NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            endpoint_path: normalize_endpoint_path(&self.endpoint),
            session_header: self.session_header.clone(),
            cors_origins: self.cors_origins.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            drain_timeout: Duration::from_secs(self.drain_timeout_secs),
        }
    }

    #[must_use]
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            max_concurrent_dispatches: self.max_concurrent_dispatches,
        }
    }
}
