/// Dispatch-level configuration for the server.
///
/// Controls how many callables may run concurrently before new requests are
/// shed.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum number of concurrent dispatches before load shedding.
    ///
    /// Each admitted dispatch occupies one thread of tokio's blocking pool.
    /// Keep this at or below the pool size (512 unless the runtime is built
    /// with a different `max_blocking_threads`), otherwise admitted dispatches
    /// queue for a thread instead of being shed.
    pub max_concurrent_dispatches: u32,
}

/// Default limit, equal to tokio's default blocking pool size.
pub const DEFAULT_MAX_CONCURRENT_DISPATCHES: u32 = 512;

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_dispatches: DEFAULT_MAX_CONCURRENT_DISPATCHES,
        }
    }
}
