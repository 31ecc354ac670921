use std::time::Instant;

use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use http::header::AUTHORIZATION;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{info, warn};

use crate::pool::SessionKey;
use crate::protocol::ChatCompletionRequest;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Transport(#[from] wreq::Error),
    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Single fixed upstream: one POST per inbound request, no retries.
#[derive(Clone)]
pub struct UpstreamClient {
    client: wreq::Client,
    url: String,
    token: String,
}

impl UpstreamClient {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: wreq::Client::new(),
            url: url.into(),
            token: token.into(),
        }
    }

    pub async fn chat(
        &self,
        request: &ChatCompletionRequest,
        key: &SessionKey,
    ) -> Result<JsonValue, UpstreamError> {
        let response = self.send(request, key).await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    pub async fn chat_stream(
        &self,
        request: &ChatCompletionRequest,
        key: &SessionKey,
    ) -> Result<BoxStream<'static, Result<Bytes, wreq::Error>>, UpstreamError> {
        let mut request = request.clone();
        request.stream = true;
        let response = self.send(&request, key).await?;
        let response = check_status(response).await?;
        Ok(response.bytes_stream().boxed())
    }

    async fn send(
        &self,
        request: &ChatCompletionRequest,
        _key: &SessionKey,
    ) -> Result<wreq::Response, UpstreamError> {
        // TODO: forward the selected session key once the upstream accepts
        // per-key auth; today every call goes out with the shared static
        // token and the selected key is only used for rotation accounting.
        let started = Instant::now();
        info!(
            event = "upstream_request",
            model = %request.model,
            stream = request.stream,
            messages = request.messages.len(),
        );
        let response = self
            .client
            .post(&self.url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .json(request)
            .send()
            .await
            .map_err(|err| {
                warn!(
                    event = "upstream_response",
                    status = "error",
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %err,
                );
                err
            })?;
        info!(
            event = "upstream_response",
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
        );
        Ok(response)
    }
}

async fn check_status(response: wreq::Response) -> Result<wreq::Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(UpstreamError::Status {
        status: status.as_u16(),
        body,
    })
}
