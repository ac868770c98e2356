use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::envelope::RequestEnvelope;
use crate::error::DispatchError;

/// Per-request invocation context.
///
/// Built by the transport for each incoming call and handed to
/// [`Registry::execute`](crate::Registry::execute). A callable whose first
/// parameter is `Context` receives a clone of it. Cloning is cheap; all clones
/// share the same request and cancellation token.
#[derive(Debug, Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

#[derive(Debug)]
struct ContextInner {
    session: String,
    request: RequestEnvelope,
    cancellation: CancellationToken,
}

impl Context {
    /// Creates a context with a fresh, never-cancelled token.
    #[must_use]
    pub fn new(session: impl Into<String>, request: RequestEnvelope) -> Self {
        Self::with_cancellation(session, request, CancellationToken::new())
    }

    /// Creates a context bound to a transport-owned cancellation token.
    #[must_use]
    pub fn with_cancellation(
        session: impl Into<String>,
        request: RequestEnvelope,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                session: session.into(),
                request,
                cancellation,
            }),
        }
    }

    /// Session identifier supplied by the transport (empty if none).
    #[must_use]
    pub fn session(&self) -> &str {
        &self.inner.session
    }

    #[must_use]
    pub fn request(&self) -> &RequestEnvelope {
        &self.inner.request
    }

    /// Whether the transport has given up on this request.
    ///
    /// The dispatcher never checks this; long-running callables may.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancellation.is_cancelled()
    }

    /// Decodes the request's raw JSON payload into `T`.
    ///
    /// Decoding is never done eagerly: a JSON-mode callable calls this when
    /// and with whatever target shape it needs.
    ///
    /// # Errors
    ///
    /// Returns `MissingPayload` if the request carried no (or an empty)
    /// payload, and `DecodeFailure` if the payload does not match `T`.
    pub fn decode_payload<T: DeserializeOwned>(&self) -> Result<T, DispatchError> {
        let payload = self
            .inner
            .request
            .payload()
            .ok_or(DispatchError::MissingPayload)?;
        serde_json::from_str(payload).map_err(|e| DispatchError::DecodeFailure(e.to_string()))
    }
}
