//! Load-shedding middleware for dispatches.
//!
//! Rejects a dispatch when the server is overloaded (concurrent count exceeds
//! `max_concurrent_dispatches`) with `ServeError::Overloaded`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{self, Poll};

use kairpc_core::{Context, ResultEnvelope};
use tokio::sync::Semaphore;
use tower::{Layer, Service};

use crate::service::error::ServeError;

// ---------------------------------------------------------------------------
// LoadShedLayer
// ---------------------------------------------------------------------------

/// Tower layer that limits concurrent dispatches via a semaphore.
///
/// When all permits are taken, incoming requests are rejected immediately
/// with `ServeError::Overloaded` rather than queued.
#[derive(Debug, Clone)]
pub struct LoadShedLayer {
    semaphore: Arc<Semaphore>,
}

impl LoadShedLayer {
    /// Create a new `LoadShedLayer` with the given concurrency limit.
    #[must_use]
    pub fn new(max_concurrent: u32) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent as usize)),
        }
    }
}

impl<S> Layer<S> for LoadShedLayer {
    type Service = LoadShedService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoadShedService {
            inner,
            semaphore: Arc::clone(&self.semaphore),
        }
    }
}

// ---------------------------------------------------------------------------
// LoadShedService
// ---------------------------------------------------------------------------

/// Service wrapper that enforces a concurrency limit via semaphore-based backpressure.
#[derive(Debug, Clone)]
pub struct LoadShedService<S> {
    inner: S,
    semaphore: Arc<Semaphore>,
}

impl<S> Service<Context> for LoadShedService<S>
where
    S: Service<Context, Response = ResultEnvelope, Error = ServeError> + Send,
    S::Future: Send + 'static,
{
    type Response = ResultEnvelope;
    type Error = ServeError;
    type Future = Pin<Box<dyn Future<Output = Result<ResultEnvelope, ServeError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, ctx: Context) -> Self::Future {
        let Ok(permit) = Arc::clone(&self.semaphore).try_acquire_owned() else {
            return Box::pin(async { Err(ServeError::Overloaded) });
        };

        let fut = self.inner.call(ctx);
        Box::pin(async move {
            // Held until the blocking dispatch finishes.
            let result = fut.await;
            drop(permit);
            result
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use kairpc_core::RequestEnvelope;
    use tower::ServiceExt;

    use super::*;

    /// Service that holds for a configurable duration.
    struct SlowService {
        delay_ms: u64,
    }

    impl Service<Context> for SlowService {
        type Response = ResultEnvelope;
        type Error = ServeError;
        type Future = Pin<Box<dyn Future<Output = Result<ResultEnvelope, ServeError>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut task::Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, ctx: Context) -> Self::Future {
            let delay = self.delay_ms;
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(ResultEnvelope {
                    id: ctx.request().id.clone(),
                    ..ResultEnvelope::default()
                })
            })
        }
    }

    fn make_ctx() -> Context {
        Context::new("s", RequestEnvelope::new("slow", vec![]).id("1"))
    }

    #[tokio::test]
    async fn allows_dispatches_under_limit() {
        let layer = LoadShedLayer::new(10);
        let svc = layer.layer(SlowService { delay_ms: 1 });
        let resp = svc.oneshot(make_ctx()).await.unwrap();
        assert_eq!(resp.id.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn rejects_when_overloaded() {
        let layer = LoadShedLayer::new(1);
        let mut svc = layer.layer(SlowService { delay_ms: 500 });

        // First dispatch acquires the single permit.
        let _ = ServiceExt::ready(&mut svc).await.unwrap();
        let _in_flight = tokio::spawn({
            let fut = svc.call(make_ctx());
            async move { fut.await }
        });

        tokio::time::sleep(Duration::from_millis(10)).await;

        let err = svc.call(make_ctx()).await.unwrap_err();
        assert!(matches!(err, ServeError::Overloaded));
    }

    #[tokio::test]
    async fn permit_is_released_after_completion() {
        let layer = LoadShedLayer::new(1);
        let mut svc = layer.layer(SlowService { delay_ms: 1 });

        svc.call(make_ctx()).await.unwrap();
        svc.call(make_ctx()).await.unwrap();
    }
}
