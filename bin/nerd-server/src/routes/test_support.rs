//! Shared fixtures for router tests: an in-memory app wired to a fake
//! completion provider.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use nerd_core::{
    CompletionProvider, CompletionRequest, CompletionResponse, ImageStore, ManualClock,
    RelayError, ResponseMessage,
};
use serde_json::Value;
use tower::ServiceExt;

use crate::config::Config;
use crate::state::AppState;

/// Echoes the last message back and remembers every request.
#[derive(Default)]
pub struct FakeProvider {
    requests: Mutex<Vec<CompletionRequest>>,
    fail: bool,
}

impl FakeProvider {
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CompletionProvider for FakeProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn endpoint(&self) -> String {
        "http://127.0.0.1:11434".into()
    }

    async fn chat(&self, request: CompletionRequest) -> Result<CompletionResponse, RelayError> {
        let last = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);

        if self.fail {
            return Err(RelayError::backend("connection refused"));
        }
        Ok(CompletionResponse {
            model,
            created_at: "2026-10-19T08:00:00Z".into(),
            message: ResponseMessage::assistant(format!("echo: {last}")),
            done: true,
        })
    }
}

fn build(provider: Arc<FakeProvider>, images: ImageStore) -> Router {
    let config = Config {
        static_dir: "does-not-exist".into(),
        ..Config::default()
    };
    let state = AppState::new(config, images, provider).expect("test state");
    super::build(Arc::new(state))
}

pub fn test_app() -> (Router, Arc<FakeProvider>) {
    let provider = Arc::new(FakeProvider::default());
    (build(provider.clone(), ImageStore::default()), provider)
}

pub fn test_app_failing() -> (Router, Arc<FakeProvider>) {
    let provider = Arc::new(FakeProvider { fail: true, ..Default::default() });
    (build(provider.clone(), ImageStore::default()), provider)
}

pub fn test_app_with_clock() -> (Router, Arc<FakeProvider>, Arc<ManualClock>) {
    let provider = Arc::new(FakeProvider::default());
    let clock = Arc::new(ManualClock::new());
    let images = ImageStore::with_clock(Duration::from_secs(60 * 60), clock.clone());
    (build(provider.clone(), images), provider, clock)
}

pub fn request(method: Method, uri: &str, body: &str) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if !body.is_empty() {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    builder.body(Body::from(body.to_owned())).unwrap()
}

/// Send one request and decode the JSON response (`Null` for non-JSON).
pub async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = body.map(|b| b.to_string()).unwrap_or_default();
    let resp = app.oneshot(request(method, uri, &body)).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}
