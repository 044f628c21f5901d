use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::post,
};
use std::sync::Arc;

use crate::api::model_client::ModelClient;
use crate::config::Config;
use crate::handlers::relay::{generate_content, method_not_allowed, preflight, unsupported_path};
use crate::middleware::cors::attach_cors_headers;

/// Shared, read-only state handed to every request.
#[derive(Clone)]
pub struct RelayState {
    pub config: Arc<Config>,
    pub client: Arc<dyn ModelClient>,
}

impl RelayState {
    pub fn new(config: Arc<Config>, client: Arc<dyn ModelClient>) -> Self {
        Self { config, client }
    }
}

pub fn relay_router(state: RelayState) -> Router {
    let body_limit = state.config.body_limit;
    Router::new()
        .route(
            "/generate_content",
            post(generate_content)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .fallback(unsupported_path)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(attach_cors_headers))
        .with_state(state)
}
