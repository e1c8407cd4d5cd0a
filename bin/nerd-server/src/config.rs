//! Server configuration, loaded from environment variables at startup.

use std::time::Duration;

use nerd_core::ImageFailurePolicy;
use nerd_core::provider::ollama::DEFAULT_OLLAMA_HOST;
use nerd_core::relay::DEFAULT_MODEL;

/// Runtime configuration for nerd-server.
///
/// Every field has a default so the relay works against a stock local
/// Ollama install without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// Interface to bind (default: `"0.0.0.0"`).
    pub bind_host: String,

    /// TCP port, read from `PORT` (default: `3000`).
    pub port: u16,

    /// Base URL of the Ollama runtime.
    pub ollama_host: String,

    /// Model used when a chat request names none.
    pub default_model: String,

    /// Absolute prefix for image retrieval URLs, e.g. `http://localhost:3000`.
    /// When unset, upload responses carry relative `/api/images/{id}` URLs.
    pub public_base_url: Option<String>,

    /// Lifetime of an uploaded image.
    pub image_ttl: Duration,

    /// How often the background sweeper drops expired images.
    pub sweep_interval: Duration,

    /// Whether an unresolvable image drops silently or fails the chat.
    pub image_failure_policy: ImageFailurePolicy,

    /// Timeout for downloading external images.
    pub fetch_timeout: Duration,

    /// Maximum accepted request body size in bytes.
    pub body_limit_bytes: usize,

    /// Directory served as static files (the widget).  Missing is fine.
    pub static_dir: String,

    /// Comma-separated list of allowed CORS origins; `None` allows any.
    pub cors_allowed_origins: Option<String>,

    /// Serve Swagger UI at `/swagger-ui`.
    pub enable_swagger: bool,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".into(),
            port: 3000,
            ollama_host: DEFAULT_OLLAMA_HOST.into(),
            default_model: DEFAULT_MODEL.into(),
            public_base_url: None,
            image_ttl: nerd_core::store::DEFAULT_IMAGE_TTL,
            sweep_interval: Duration::from_secs(60),
            image_failure_policy: ImageFailurePolicy::Drop,
            fetch_timeout: Duration::from_secs(10),
            body_limit_bytes: 15 * 1024 * 1024,
            static_dir: "public".into(),
            cors_allowed_origins: None,
            enable_swagger: true,
            log_level: "info".into(),
            log_json: false,
        }
    }
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            bind_host: env_or("NERD_BIND_HOST", &d.bind_host),
            port: parse_env("PORT", d.port),
            ollama_host: env_or("OLLAMA_HOST", &d.ollama_host),
            default_model: env_or("NERD_MODEL", &d.default_model),
            public_base_url: env_opt("NERD_PUBLIC_URL").map(|u| u.trim_end_matches('/').to_owned()),
            image_ttl: Duration::from_secs(parse_env("NERD_IMAGE_TTL_SECS", d.image_ttl.as_secs())),
            sweep_interval: Duration::from_secs(
                parse_env("NERD_SWEEP_INTERVAL_SECS", d.sweep_interval.as_secs()).max(1),
            ),
            image_failure_policy: parse_env("NERD_IMAGE_FAILURE", d.image_failure_policy),
            fetch_timeout: Duration::from_secs(parse_env("NERD_FETCH_TIMEOUT_SECS", d.fetch_timeout.as_secs())),
            body_limit_bytes: parse_env("NERD_BODY_LIMIT_BYTES", d.body_limit_bytes),
            static_dir: env_or("NERD_STATIC_DIR", &d.static_dir),
            cors_allowed_origins: env_opt("NERD_CORS_ORIGINS"),
            enable_swagger: std::env::var("NERD_ENABLE_SWAGGER")
                .map(|v| !(v == "0" || v.eq_ignore_ascii_case("false")))
                .unwrap_or(d.enable_swagger),
            log_level: env_or("NERD_LOG", &d.log_level),
            log_json: std::env::var("NERD_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(d.log_json),
        }
    }

    /// `host:port` string for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }

    /// URL handed back to the uploader for a stored image.
    pub fn image_url(&self, path: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{base}{path}"),
            None => path.to_owned(),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
