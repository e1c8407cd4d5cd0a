use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request body for `POST /api/upload-image`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UploadImageRequest {
    /// Image as a data URL (`data:image/png;base64,...`) or bare base64.
    #[serde(default)]
    pub image: Option<String>,
}

/// Response body for `POST /api/upload-image`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadImageResponse {
    /// Retrieval URL, valid until the image expires.
    pub url: String,
    /// Opaque image id.
    pub id: String,
}
