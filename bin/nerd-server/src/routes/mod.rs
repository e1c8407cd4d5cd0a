//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (body limit, CORS, per-request trace-ID injection)
//! - Optional Swagger UI / OpenAPI spec endpoint (disable with `NERD_ENABLE_SWAGGER=false`)
//! - Health route
//! - Image upload / retrieval and chat routes under `/api`
//! - Static widget files as the fallback

mod chat;
pub mod doc;
mod health;
mod images;
#[cfg(test)]
mod test_support;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{Router, middleware};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ServerError;
use crate::middleware::{cors, trace};
use crate::state::AppState;

// ── Router builder ────────────────────────────────────────────────────────────

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .merge(health::router())
        .merge(images::router())
        .merge(chat::router());

    let mut app = Router::new().merge(api_router);

    if state.config.enable_swagger {
        app = app.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", doc::get_docs()));
    }

    app.fallback_service(ServeDir::new(&state.config.static_dir))
        .layer(DefaultBodyLimit::max(state.config.body_limit_bytes))
        // Outermost layers execute first on the way in.
        .layer(ServiceBuilder::new().layer(cors::cors_layer(state.clone())))
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}

/// Parse a JSON request body, treating an empty body as `T::default()`.
///
/// Handlers take the raw bytes instead of `Json<T>` so that every malformed
/// body is reported as a 400 with an `error` field, whatever its
/// content type.
pub(crate) fn parse_json_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ServerError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ServerError::BadRequest(format!("invalid JSON body: {e}")))
}
