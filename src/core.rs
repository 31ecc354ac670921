use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::BearerAuth;
use crate::handler::{chat_completions, health, list_models};
use crate::pool::{KeyPool, SelectionPolicy};
use crate::upstream::UpstreamClient;

pub struct GatewayState {
    pub auth: BearerAuth,
    pub pool: Arc<KeyPool>,
    pub upstream: UpstreamClient,
    pub policy: SelectionPolicy,
}

pub struct Gateway {
    state: Arc<GatewayState>,
}

impl Gateway {
    pub fn new(
        auth: BearerAuth,
        pool: Arc<KeyPool>,
        upstream: UpstreamClient,
        policy: SelectionPolicy,
    ) -> Self {
        Self {
            state: Arc::new(GatewayState {
                auth,
                pool,
                upstream,
                policy,
            }),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/v1/models", get(list_models))
            .route("/v1/chat/completions", post(chat_completions))
            .route("/health", get(health))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    pub fn state(&self) -> Arc<GatewayState> {
        self.state.clone()
    }
}
