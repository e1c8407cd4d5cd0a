use utoipa::OpenApi;

use crate::routes::{chat, health, images};

#[derive(OpenApi)]
#[openapi(info(
    title = "nerd-server",
    description = "Nerd Agent relay between the chat widget and a local Ollama runtime",
    version = "0.1.0"
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(images::ImagesApi::openapi());
    root.merge(chat::ChatApi::openapi());
    root
}
