use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::pool::PoolError;
use crate::upstream::UpstreamError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("missing or invalid bearer token")]
    Unauthorized,
    #[error("invalid request body: {0}")]
    BadRequest(#[from] serde_json::Error),
    #[error("no session keys available")]
    NoSessionKeys,
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl From<PoolError> for GatewayError {
    fn from(_: PoolError) -> Self {
        GatewayError::NoSessionKeys
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            GatewayError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Unauthorized"})),
            )
                .into_response(),
            GatewayError::BadRequest(_) => (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "Invalid request body"})),
            )
                .into_response(),
            GatewayError::NoSessionKeys => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"error": "No session keys available"})),
            )
                .into_response(),
            GatewayError::Upstream(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": {"message": err.to_string(), "type": "api_error"}})),
            )
                .into_response(),
        }
    }
}
