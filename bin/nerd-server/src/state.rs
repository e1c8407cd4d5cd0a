//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use nerd_core::{ChatRelay, CompletionProvider, HttpImageFetcher, ImageStore, Normalizer};

use crate::config::Config;

/// State shared across all HTTP handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Uploaded images; the same handle the relay resolves against.
    pub images: ImageStore,
    /// Normalizer + completion provider.
    pub relay: Arc<ChatRelay>,
}

impl AppState {
    /// Wire a relay around `provider` and `images` according to `config`.
    pub fn new(
        config: Config,
        images: ImageStore,
        provider: Arc<dyn CompletionProvider>,
    ) -> anyhow::Result<Self> {
        let fetcher = Arc::new(HttpImageFetcher::new(config.fetch_timeout)?);
        let mut normalizer =
            Normalizer::new(images.clone(), fetcher).with_policy(config.image_failure_policy);
        if let Some(base) = &config.public_base_url {
            normalizer = normalizer.with_public_base_url(base);
        }
        let relay = ChatRelay::new(normalizer, provider).with_default_model(&config.default_model);

        Ok(Self {
            config: Arc::new(config),
            images,
            relay: Arc::new(relay),
        })
    }
}
