//! Metrics middleware for dispatches.
//!
//! Wraps each dispatch in a `tracing` span and records its outcome and
//! duration through the `metrics` facade. Nothing is exported unless the
//! binary installs a recorder.

use std::future::Future;
use std::pin::Pin;
use std::task::{self, Poll};
use std::time::Instant;

use kairpc_core::{Context, ResultEnvelope};
use tower::{Layer, Service};
use tracing::{info_span, Instrument};

use crate::service::error::ServeError;

/// Total dispatches, labelled by `outcome`.
pub const DISPATCH_TOTAL: &str = "kairpc_dispatch_total";
/// Dispatch latency in seconds, labelled by `outcome`.
pub const DISPATCH_DURATION: &str = "kairpc_dispatch_duration_seconds";

// ---------------------------------------------------------------------------
// MetricsLayer
// ---------------------------------------------------------------------------

/// Tower layer that instruments dispatches with timing and counting.
#[derive(Debug, Clone)]
pub struct MetricsLayer;

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService { inner }
    }
}

// ---------------------------------------------------------------------------
// MetricsService
// ---------------------------------------------------------------------------

/// Service wrapper that records dispatch duration and outcome.
#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    inner: S,
}

/// Classifies a finished dispatch for labelling.
///
/// `failure` means the callable ran and reported a failure; `rejected` means
/// it never ran.
fn outcome(result: &Result<ResultEnvelope, ServeError>) -> &'static str {
    match result {
        Ok(envelope) if envelope.is_failure() => "failure",
        Ok(_) => "ok",
        Err(_) => "rejected",
    }
}

impl<S> Service<Context> for MetricsService<S>
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
        let operation = ctx.request().operation.clone();
        let span = info_span!(
            "rpc",
            operation = %operation,
            session = ctx.session(),
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        let fut = self.inner.call(ctx);

        Box::pin(
            async move {
                let start = Instant::now();
                let result = fut.await;
                let elapsed = start.elapsed();
                let outcome = outcome(&result);

                #[allow(clippy::cast_possible_truncation)]
                let duration_ms = elapsed.as_millis() as u64;
                tracing::Span::current().record("duration_ms", duration_ms);
                tracing::Span::current().record("outcome", outcome);

                metrics::counter!(DISPATCH_TOTAL, "outcome" => outcome).increment(1);
                metrics::histogram!(DISPATCH_DURATION, "outcome" => outcome)
                    .record(elapsed.as_secs_f64());

                match &result {
                    Err(err) => tracing::info!(%operation, duration_ms, outcome, error = %err, "dispatch complete"),
                    Ok(_) => tracing::info!(%operation, duration_ms, outcome, "dispatch complete"),
                }

                result
            }
            .instrument(span),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
