//! Per-request trace span.
//!
//! Every request gets an `http_request` span carrying a trace id taken from
//! the `x-trace-id` header (or freshly generated), which is echoed back on
//! the response.  Small JSON bodies are logged; anything else, such as
//! base64 image uploads or PNG responses, is only summarized and is never
//! buffered.

use std::time::Instant;

use axum::body::{Body, Bytes, HttpBody};
use axum::extract::Request;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::middleware::Next;
use axum::response::Response;
use http_body_util::BodyExt;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

pub static X_TRACE_ID: &str = "x-trace-id";

/// JSON bodies up to this size are logged verbatim.
const MAX_LOGGED_BODY: u64 = 1024;

pub async fn trace_middleware(req: Request<Body>, next: Next) -> Response {
    let start_time = Instant::now();

    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    async move {
        info!("→ request started");
        let mut req = log_body("request", req).await;
        let header_value = HeaderValue::from_str(&trace_id.to_string()).ok();
        if let Some(v) = &header_value {
            req.headers_mut().insert(X_TRACE_ID, v.clone());
        }

        let response = next.run(req).await;

        let mut response = log_body("response", response).await;
        if let Some(v) = header_value {
            response.headers_mut().insert(X_TRACE_ID, v);
        }

        info!(
            status = response.status().as_u16(),
            latency_ms = start_time.elapsed().as_millis() as u64,
            "← response finished"
        );
        response
    }
    .instrument(span)
    .await
}

/// Anything with headers and a body that can be split and rebuilt.
trait Message: Sized {
    fn headers(&self) -> &HeaderMap;
    fn split(self) -> (Self, Body);
    fn with_body(self, body: Body) -> Self;
}

impl Message for Request<Body> {
    fn headers(&self) -> &HeaderMap {
        Request::headers(self)
    }
    fn split(self) -> (Self, Body) {
        let (parts, body) = self.into_parts();
        (Request::from_parts(parts, Body::empty()), body)
    }
    fn with_body(self, body: Body) -> Self {
        let (parts, _) = self.into_parts();
        Request::from_parts(parts, body)
    }
}

impl Message for Response {
    fn headers(&self) -> &HeaderMap {
        Response::headers(self)
    }
    fn split(self) -> (Self, Body) {
        let (parts, body) = self.into_parts();
        (Response::from_parts(parts, Body::empty()), body)
    }
    fn with_body(self, body: Body) -> Self {
        let (parts, _) = self.into_parts();
        Response::from_parts(parts, body)
    }
}

/// Log a small JSON body verbatim, or just its type and size.
async fn log_body<M: Message>(direction: &str, msg: M) -> M {
    let content_type = msg
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_owned();
    let (msg, body) = msg.split();
    let size = body.size_hint().exact().or_else(|| {
        msg.headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
    });

    let small_json =
        content_type.contains("application/json") && size.is_some_and(|n| n <= MAX_LOGGED_BODY);
    if !small_json {
        if let Some(size) = size.filter(|n| *n > 0) {
            info!("{} body: [skipped: type={}, size={}]", direction, content_type, size);
        }
        return msg.with_body(body);
    }

    let bytes: Bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(error = %e, "failed to read {} body", direction);
            Bytes::new()
        }
    };
    if let Ok(text) = std::str::from_utf8(&bytes) {
        info!("{} body: {}", direction, text);
    }
    msg.with_body(Body::from(bytes))
}
