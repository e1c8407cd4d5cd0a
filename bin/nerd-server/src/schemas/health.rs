use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Always `true` while the process is serving.
    pub ok: bool,
    /// Default model used for chat requests that do not name one.
    pub model: String,
    /// nerd-server version.
    pub version: String,
}
