//! nerd-core – the relay logic behind the Nerd Agent chat widget.
//!
//! - [`store`]: ephemeral, TTL-bounded image storage addressed by retrieval URL.
//! - [`normalize`]: turns widget chat history into backend-ready messages.
//! - [`provider`]: the completion-provider capability and its Ollama client.
//! - [`relay`]: glues normalization and a provider into a single chat call.
//! - [`session`]: an owned chat history, as kept by a client.

pub mod clock;
pub mod error;
pub mod normalize;
pub mod provider;
pub mod relay;
pub mod session;
pub mod store;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::RelayError;
pub use normalize::{HttpImageFetcher, ImageFailurePolicy, ImageFetcher, Normalizer};
pub use provider::{CompletionProvider, CompletionRequest, CompletionResponse, ResponseMessage};
pub use provider::ollama::OllamaProvider;
pub use relay::{ChatRelay, ChatReply, RelayRequest};
pub use session::ChatSession;
pub use store::{ImageStore, StoredImage, UploadedImage};
pub use types::{BackendMessage, ChatMessage, ContentPart, MessageContent, Role};
