use std::io;
use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures_util::StreamExt;
use serde_json::json;
use tracing::{error, info};

use crate::core::GatewayState;
use crate::error::GatewayError;
use crate::pool::{SessionKey, now_epoch_seconds};
use crate::protocol::{ChatCompletionRequest, DEFAULT_MODEL, ListModelsResponse};
use crate::sse;

pub async fn chat_completions(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    require_auth(&state, &headers)?;
    let request: ChatCompletionRequest = serde_json::from_slice(&body)?;
    let key = state.pool.select(state.policy)?;
    info!(
        model = %request.model,
        stream = request.stream,
        messages = request.messages.len(),
        "chat completion request"
    );

    if request.stream {
        return Ok(stream_response(state, request, key));
    }

    let body = state.upstream.chat(&request, &key).await.map_err(|err| {
        error!(
            model = %request.model,
            stream = false,
            messages = request.messages.len(),
            error = %err,
            "upstream call failed"
        );
        err
    })?;
    Ok(Json(body).into_response())
}

/// Relays the upstream byte stream as SSE. The upstream call happens inside
/// the body stream, so pre-flight and mid-stream failures both surface as one
/// terminal error event rather than an HTTP error status.
fn stream_response(
    state: Arc<GatewayState>,
    request: ChatCompletionRequest,
    key: SessionKey,
) -> Response {
    let stream = async_stream::stream! {
        let mut upstream = match state.upstream.chat_stream(&request, &key).await {
            Ok(stream) => stream,
            Err(err) => {
                error!(
                    model = %request.model,
                    stream = true,
                    messages = request.messages.len(),
                    error = %err,
                    "upstream call failed"
                );
                yield Ok::<Bytes, io::Error>(sse::error_event(&err.to_string()));
                return;
            }
        };

        let mut framer = sse::LineFramer::new();
        while let Some(chunk) = upstream.next().await {
            match chunk {
                Ok(bytes) => {
                    for event in framer.push(&bytes) {
                        yield Ok(event);
                    }
                }
                Err(err) => {
                    error!(
                        model = %request.model,
                        stream = true,
                        messages = request.messages.len(),
                        error = %err,
                        "upstream stream interrupted"
                    );
                    yield Ok(sse::error_event(&err.to_string()));
                    return;
                }
            }
        }
        if let Some(event) = framer.finish() {
            yield Ok(event);
        }
    };

    let mut response = Response::new(Body::from_stream(stream));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    response
}

pub async fn list_models(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    require_auth(&state, &headers)?;
    let catalog = ListModelsResponse::single(DEFAULT_MODEL, now_epoch_seconds() as i64);
    Ok(Json(catalog).into_response())
}

pub async fn health(State(state): State<Arc<GatewayState>>) -> Response {
    Json(json!({
        "status": "healthy",
        "session_keys_count": state.pool.len(),
    }))
    .into_response()
}

fn require_auth(state: &GatewayState, headers: &HeaderMap) -> Result<(), GatewayError> {
    if state.auth.authenticate(headers) {
        Ok(())
    } else {
        Err(GatewayError::Unauthorized)
    }
}
