//! Request / response bodies of the HTTP API, with their OpenAPI schemas.

pub mod chat;
pub mod health;
pub mod images;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of every non-2xx JSON response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}
