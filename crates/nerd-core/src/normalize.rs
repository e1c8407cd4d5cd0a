//! Chat history normalization.
//!
//! The widget sends messages whose content is either a string or an ordered
//! list of text/image parts.  The model runtime wants a flat
//! `{role, content, images?}` where `images` holds bare base64 payloads.
//! [`Normalizer`] bridges the two, resolving every image reference through
//! the [`ImageStore`] or over the network.

use std::fmt::Debug;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use futures::future::{join_all, try_join_all};
use tracing::{debug, warn};

use crate::error::RelayError;
use crate::store::{IMAGE_ROUTE_PREFIX, ImageStore, local_image_id, strip_data_url_prefix};
use crate::types::{BackendMessage, ChatMessage, ContentPart, MessageContent};

/// Stand-in content for messages without text; the runtime rejects "".
pub const EMPTY_CONTENT_PLACEHOLDER: &str = " ";

/// What to do when an image reference cannot be resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImageFailurePolicy {
    /// Log and leave the image out of the outgoing message.
    #[default]
    Drop,
    /// Fail the whole normalization with [`RelayError::ResolutionFailure`].
    Fail,
}

impl FromStr for ImageFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "fail" => Ok(Self::Fail),
            other => Err(format!("unknown image failure policy '{other}' (expected 'drop' or 'fail')")),
        }
    }
}

/// Capability for downloading external images.
#[async_trait]
pub trait ImageFetcher: Debug + Send + Sync {
    /// Return the raw body bytes found at `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, RelayError>;
}

/// [`ImageFetcher`] over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, RelayError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| RelayError::resolution(url, e.to_string()))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| RelayError::resolution(url, e.to_string()))?;
        Ok(body.to_vec())
    }
}

/// Turns widget history into backend-ready messages.
#[derive(Debug, Clone)]
pub struct Normalizer {
    store: ImageStore,
    fetcher: Arc<dyn ImageFetcher>,
    policy: ImageFailurePolicy,
    /// Origin under which absolute retrieval URLs count as ours.
    public_base_url: Option<String>,
}

impl Normalizer {
    pub fn new(store: ImageStore, fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self {
            store,
            fetcher,
            policy: ImageFailurePolicy::default(),
            public_base_url: None,
        }
    }

    /// Treat absolute URLs under `base` as references into the store.
    /// Without it only relative retrieval paths are looked up locally.
    pub fn with_public_base_url(mut self, base: impl Into<String>) -> Self {
        self.public_base_url = Some(base.into().trim_end_matches('/').to_owned());
        self
    }

    pub fn with_policy(mut self, policy: ImageFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &ImageStore {
        &self.store
    }

    pub fn policy(&self) -> ImageFailurePolicy {
        self.policy
    }

    /// Normalize a whole history.  Output order matches input order.
    pub async fn normalize(
        &self,
        history: &[ChatMessage],
    ) -> Result<Vec<BackendMessage>, RelayError> {
        try_join_all(history.iter().map(|msg| self.normalize_message(msg))).await
    }

    pub async fn normalize_message(&self, msg: &ChatMessage) -> Result<BackendMessage, RelayError> {
        let (text, urls) = flatten_content(msg.content.as_ref());

        let mut images = Vec::with_capacity(urls.len());
        if !urls.is_empty() {
            debug!(count = urls.len(), "resolving images");
            let resolved = join_all(urls.iter().map(|url| self.resolve_image(url))).await;
            for (url, result) in urls.iter().zip(resolved) {
                match (result, self.policy) {
                    (Ok(b64), _) => images.push(b64),
                    (Err(e), ImageFailurePolicy::Drop) => {
                        warn!(url = %url, error = %e, "dropping unresolved image");
                    }
                    (Err(e), ImageFailurePolicy::Fail) => return Err(e),
                }
            }
        }

        Ok(BackendMessage {
            role: msg.role,
            content: if text.is_empty() {
                EMPTY_CONTENT_PLACEHOLDER.to_owned()
            } else {
                text
            },
            images: (!images.is_empty()).then_some(images),
        })
    }

    /// Resolve one image reference to a bare base64 payload.
    ///
    /// Store references are looked up first; an absolute URL the store does
    /// not know is fetched like any other external image.
    pub async fn resolve_image(&self, url: &str) -> Result<String, RelayError> {
        if url.trim().is_empty() {
            return Err(RelayError::resolution(url, "image part has no url"));
        }

        if let Some(id) = self.local_id(url) {
            match self.store.get(id).await {
                Ok(payload) => return Ok(strip_data_url_prefix(&payload).to_owned()),
                Err(e) if !is_absolute(url) => {
                    return Err(RelayError::resolution(url, e.to_string()));
                }
                Err(e) => debug!(url, error = %e, "image not in store, fetching"),
            }
        }

        if url.starts_with("data:") {
            let data = strip_data_url_prefix(url);
            if data.is_empty() || data == url {
                return Err(RelayError::resolution(url, "malformed data URL"));
            }
            return Ok(data.to_owned());
        }

        let bytes = self.fetcher.fetch(url).await?;
        if bytes.is_empty() {
            return Err(RelayError::resolution(url, "empty response body"));
        }
        Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    /// Store id for relative retrieval paths and URLs under the public base.
    fn local_id<'a>(&self, url: &'a str) -> Option<&'a str> {
        if url.starts_with(IMAGE_ROUTE_PREFIX) {
            return local_image_id(url);
        }
        let base = self.public_base_url.as_deref()?;
        url.strip_prefix(base)
            .filter(|rest| rest.starts_with(IMAGE_ROUTE_PREFIX))
            .and_then(local_image_id)
    }
}

fn is_absolute(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Concatenate text parts and collect image URLs, both in order.
fn flatten_content(content: Option<&MessageContent>) -> (String, Vec<String>) {
    match content {
        None => (String::new(), Vec::new()),
        Some(MessageContent::Text(text)) => (text.clone(), Vec::new()),
        Some(MessageContent::Parts(parts)) => {
            let mut text = String::new();
            let mut urls = Vec::new();
            for part in parts {
                match part {
                    ContentPart::Text { text: t } => text.push_str(t),
                    ContentPart::Image { url } => urls.push(url.clone().unwrap_or_default()),
                    ContentPart::Unsupported => {}
                }
            }
            (text, urls)
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
