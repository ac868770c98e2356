//! The dispatch endpoint.
//!
//! Accepts a request envelope as JSON, or as `MsgPack` when the request's
//! content type is `application/msgpack`, and answers in the same encoding.
//! The status is always 200: every failure, including an undecodable body
//! and an expired request timeout, is reported as an envelope carrying only
//! `e`.

use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use kairpc_core::{Context, RequestEnvelope, ResultEnvelope};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use tracing::warn;

use super::AppState;
use crate::service::ServeError;

/// Content type selecting `MsgPack` request and response bodies.
pub const MSGPACK_CONTENT_TYPE: &str = "application/msgpack";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyFormat {
    Json,
    MsgPack,
}

impl BodyFormat {
    fn from_headers(headers: &HeaderMap) -> Self {
        let is_msgpack = headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with(MSGPACK_CONTENT_TYPE));
        if is_msgpack {
            Self::MsgPack
        } else {
            Self::Json
        }
    }

    fn decode(self, body: &[u8]) -> Result<RequestEnvelope, String> {
        match self {
            Self::Json => serde_json::from_slice(body).map_err(|e| e.to_string()),
            Self::MsgPack => rmp_serde::from_slice(body).map_err(|e| e.to_string()),
        }
    }

    fn respond(self, envelope: &ResultEnvelope) -> Response {
        match self {
            Self::Json => (StatusCode::OK, Json(envelope)).into_response(),
            Self::MsgPack => match rmp_serde::to_vec_named(envelope) {
                Ok(bytes) => (
                    StatusCode::OK,
                    [(
                        header::CONTENT_TYPE,
                        HeaderValue::from_static(MSGPACK_CONTENT_TYPE),
                    )],
                    bytes,
                )
                    .into_response(),
                Err(e) => {
                    warn!(error = %e, "failed to encode MsgPack response");
                    Self::Json.respond(&ResultEnvelope::failure(format!(
                        "failed to encode response: {e}"
                    )))
                }
            },
        }
    }
}

/// `POST <endpoint>`: decodes the envelope, dispatches it, encodes the result.
///
/// The session id is read from the configured session header (empty when
/// absent or not valid UTF-8).
pub async fn rpc_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let format = BodyFormat::from_headers(&headers);

    let request = match format.decode(&body) {
        Ok(request) => request,
        Err(e) => {
            return format.respond(&ResultEnvelope::failure(format!(
                "invalid request body: {e}"
            )))
        }
    };

    let session = headers
        .get(state.config.session_header.as_str())
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let timeout = state.config.request_timeout;
    let envelope = match tokio::time::timeout(timeout, dispatch(&state, session, request)).await {
        Ok(Ok(envelope)) => envelope,
        Ok(Err(err)) => ResultEnvelope::failure(err.to_string()),
        Err(_) => {
            warn!(?timeout, "dispatch exceeded request timeout");
            ResultEnvelope::failure(ServeError::TimedOut.to_string())
        }
    };
    format.respond(&envelope)
}

/// Runs one dispatch through the service stack.
///
/// The context's cancellation token fires if this future is dropped before
/// the dispatch completes (client disconnect or request timeout). Drain
/// tracking is owned by the dispatch service, not by this future.
async fn dispatch(
    state: &AppState,
    session: String,
    request: RequestEnvelope,
) -> Result<ResultEnvelope, ServeError> {
    let token = CancellationToken::new();
    let cancel_on_drop = token.clone().drop_guard();
    let ctx = Context::with_cancellation(session, request, token);

    let result = state.dispatcher.clone().oneshot(ctx).await;
    cancel_on_drop.disarm();
    result
}
