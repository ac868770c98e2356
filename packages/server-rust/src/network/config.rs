//! Network configuration types for the kairpc server.

use std::time::Duration;

use kairpc_core::DEFAULT_ENDPOINT_PATH;

/// Header carrying the caller's session identifier by default.
pub const DEFAULT_SESSION_HEADER: &str = "kairpc-session";

/// Top-level network configuration for the server.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Bind address for the server.
    pub host: String,
    /// Port to listen on. 0 means OS-assigned.
    pub port: u16,
    /// Route of the dispatch endpoint. Always starts with `/`.
    pub endpoint_path: String,
    /// Request header whose value becomes the context's session id.
    pub session_header: String,
    /// Allowed CORS origins.
    pub cors_origins: Vec<String>,
    /// Maximum time to wait for a request to complete.
    pub request_timeout: Duration,
    /// How long shutdown waits for in-flight dispatches.
    pub drain_timeout: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
            endpoint_path: DEFAULT_ENDPOINT_PATH.to_string(),
            session_header: DEFAULT_SESSION_HEADER.to_string(),
            cors_origins: vec!["*".to_string()],
            request_timeout: Duration::from_secs(30),
            drain_timeout: Duration::from_secs(30),
        }
    }
}

/// Prefixes `path` with `/` when it is missing.
#[must_use]
pub fn normalize_endpoint_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}
