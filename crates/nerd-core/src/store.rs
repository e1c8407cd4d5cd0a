//! Ephemeral image storage.
//!
//! Uploaded images live in process memory for a fixed TTL and are addressed
//! by an opaque UUID.  Expiry is decided against an injected [`Clock`]:
//! entries are dropped when they are found expired on access, and a
//! background sweeper (see [`ImageStore::spawn_sweeper`]) clears the rest.
//! There is no capacity bound and no explicit delete.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine as _;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::error::RelayError;

/// Path prefix under which stored images are served.
pub const IMAGE_ROUTE_PREFIX: &str = "/api/images/";

/// Default lifetime of an uploaded image.
pub const DEFAULT_IMAGE_TTL: Duration = Duration::from_secs(60 * 60);

/// A single stored image.
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub id: String,
    /// Data URL or bare base64, exactly as uploaded.
    pub payload: String,
    pub expires_at: Instant,
}

/// Result of a successful [`ImageStore::put`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub id: String,
    /// Relative retrieval URL, `/api/images/{id}`.
    pub url: String,
}

/// Cloneable handle over the shared image map.
#[derive(Debug, Clone)]
pub struct ImageStore {
    inner: Arc<RwLock<HashMap<String, StoredImage>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl Default for ImageStore {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_TTL)
    }
}

impl ImageStore {
    /// Store backed by the system clock.
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store an encoded image and return its id and retrieval URL.
    pub async fn put(&self, payload: impl Into<String>) -> Result<UploadedImage, RelayError> {
        let payload = payload.into();
        if payload.trim().is_empty() {
            return Err(RelayError::InvalidInput("No image provided".into()));
        }

        let id = Uuid::new_v4().to_string();
        let record = StoredImage {
            id: id.clone(),
            expires_at: self.clock.now() + self.ttl,
            payload,
        };
        let size = record.payload.len();
        self.inner.write().await.insert(id.clone(), record);

        info!(image_id = %id, size, "image stored");
        Ok(UploadedImage {
            url: retrieval_path(&id),
            id,
        })
    }

    /// Store already-decoded image bytes (kept base64 encoded).
    pub async fn put_bytes(&self, bytes: &[u8]) -> Result<UploadedImage, RelayError> {
        if bytes.is_empty() {
            return Err(RelayError::InvalidInput("No image provided".into()));
        }
        self.put(base64::engine::general_purpose::STANDARD.encode(bytes))
            .await
    }

    /// Fetch the payload for `id`, exactly as it was uploaded.
    pub async fn get(&self, id: &str) -> Result<String, RelayError> {
        let now = self.clock.now();
        {
            let map = self.inner.read().await;
            match map.get(id) {
                None => return Err(RelayError::NotFound(id.to_owned())),
                Some(image) if now < image.expires_at => return Ok(image.payload.clone()),
                Some(_) => {}
            }
        }

        // Found but expired: drop it while we are here.
        let mut map = self.inner.write().await;
        if map.get(id).is_some_and(|image| now >= image.expires_at) {
            map.remove(id);
            debug!(image_id = %id, "expired image removed on access");
        }
        Err(RelayError::NotFound(id.to_owned()))
    }

    /// Remove every expired entry.  Returns the number removed.
    pub async fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut map = self.inner.write().await;
        let before = map.len();
        map.retain(|_, image| now < image.expires_at);
        before - map.len()
    }

    /// Number of entries currently held, expired or not.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Run [`sweep_expired`](Self::sweep_expired) every `every` until aborted.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let removed = store.sweep_expired().await;
                if removed > 0 {
                    info!(removed, "expired images swept");
                }
            }
        })
    }
}

/// Retrieval path for an image id.
pub fn retrieval_path(id: &str) -> String {
    format!("{IMAGE_ROUTE_PREFIX}{id}")
}

/// Extract the image id from a URL whose path points into the store.
///
/// Only the path is inspected, so deciding whether an absolute URL belongs
/// to this relay is up to the caller.  Query strings and fragments are
/// ignored.
pub fn local_image_id(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once(IMAGE_ROUTE_PREFIX)?;
    let id = rest.split(['?', '#']).next().unwrap_or(rest);
    let id = id.rsplit('/').next().unwrap_or(id);
    (!id.is_empty()).then_some(id)
}

/// Strip a `data:<mime>;base64,` prefix if present.
pub fn strip_data_url_prefix(payload: &str) -> &str {
    if payload.starts_with("data:") {
        if let Some((_, data)) = payload.split_once(',') {
            return data;
        }
    }
    payload
}

/// Decode a stored payload into raw image bytes.
pub fn decode_payload(payload: &str) -> Result<Vec<u8>, RelayError> {
    base64::engine::general_purpose::STANDARD
        .decode(strip_data_url_prefix(payload).trim())
        .map_err(|e| RelayError::InvalidInput(format!("image payload is not valid base64: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use proptest::prelude::*;

    const PNG_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgo=";

    fn manual_store(ttl: Duration) -> (ImageStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (ImageStore::with_clock(ttl, clock.clone()), clock)
    }

    #[tokio::test]
    async fn put_then_get_returns_the_payload() {
        let store = ImageStore::default();
        let uploaded = store.put(PNG_DATA_URL).await.expect("put");
        assert_eq!(uploaded.url, format!("/api/images/{}", uploaded.id));
        assert_eq!(store.get(&uploaded.id).await.unwrap(), PNG_DATA_URL);
    }

    #[tokio::test]
    async fn ids_are_unique() {
        let store = ImageStore::default();
        let a = store.put("AAAA").await.unwrap();
        let b = store.put("AAAA").await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let store = ImageStore::default();
        let err = store.get("never-stored").await.unwrap_err();
        assert!(matches!(err, RelayError::NotFound(id) if id == "never-stored"));
    }

    #[tokio::test]
    async fn empty_payload_is_invalid_input() {
        let store = ImageStore::default();
        assert!(matches!(
            store.put("").await,
            Err(RelayError::InvalidInput(_))
        ));
        assert!(matches!(
            store.put_bytes(&[]).await,
            Err(RelayError::InvalidInput(_))
        ));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn image_expires_after_ttl() {
        let (store, clock) = manual_store(Duration::from_secs(3600));
        let uploaded = store.put(PNG_DATA_URL).await.unwrap();

        clock.advance(Duration::from_secs(3599));
        assert!(store.get(&uploaded.id).await.is_ok());

        clock.advance(Duration::from_secs(1));
        assert!(matches!(
            store.get(&uploaded.id).await,
            Err(RelayError::NotFound(_))
        ));
        // Removed on access.
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_entries() {
        let (store, clock) = manual_store(Duration::from_secs(60));
        store.put("b2xk").await.unwrap();
        clock.advance(Duration::from_secs(30));
        let fresh = store.put("bmV3").await.unwrap();
        clock.advance(Duration::from_secs(30));

        assert_eq!(store.sweep_expired().await, 1);
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get(&fresh.id).await.unwrap(), "bmV3");
    }

    #[tokio::test]
    async fn put_bytes_round_trips_through_decode() {
        let store = ImageStore::default();
        let bytes = [0x89, b'P', b'N', b'G', 0, 1, 2, 3];
        let uploaded = store.put_bytes(&bytes).await.unwrap();
        let payload = store.get(&uploaded.id).await.unwrap();
        assert_eq!(decode_payload(&payload).unwrap(), bytes);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_task_clears_expired_entries() {
        let (store, clock) = manual_store(Duration::from_secs(10));
        store.put("AAAA").await.unwrap();
        let handle = store.spawn_sweeper(Duration::from_secs(5));

        clock.advance(Duration::from_secs(11));
        tokio::time::sleep(Duration::from_secs(6)).await;

        assert!(store.is_empty().await);
        handle.abort();
    }

    #[test]
    fn local_image_id_matches_relative_and_absolute_urls() {
        assert_eq!(local_image_id("/api/images/abc"), Some("abc"));
        assert_eq!(
            local_image_id("http://localhost:3000/api/images/abc?x=1"),
            Some("abc")
        );
        assert_eq!(local_image_id("https://example.com/cat.png"), None);
        assert_eq!(local_image_id("/api/images/"), None);
    }

    #[test]
    fn data_url_prefix_is_stripped() {
        assert_eq!(strip_data_url_prefix(PNG_DATA_URL), "iVBORw0KGgo=");
        assert_eq!(strip_data_url_prefix("iVBORw0KGgo="), "iVBORw0KGgo=");
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            decode_payload("data:image/png;base64,***"),
            Err(RelayError::InvalidInput(_))
        ));
    }

    proptest! {
        #[test]
        fn get_returns_what_put_stored(payload in "[A-Za-z0-9+/=]{1,256}") {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let stored = rt.block_on(async {
                let store = ImageStore::default();
                let uploaded = store.put(payload.clone()).await.unwrap();
                store.get(&uploaded.id).await.unwrap()
            });
            prop_assert_eq!(stored, payload);
        }
    }
}
