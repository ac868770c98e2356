use kairpc_core::DispatchError;

/// Errors returned by the dispatch pipeline.
///
/// Every variant is reported to the caller as a result envelope carrying
/// only `e`; none of them means the callable itself reported a failure.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("server overloaded, try again later")]
    Overloaded,
    #[error("server is shutting down")]
    ShuttingDown,
    #[error("request timed out")]
    TimedOut,
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
