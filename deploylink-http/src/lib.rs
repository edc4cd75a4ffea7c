//! Minimal JSON-over-HTTP client for the GitHub REST API.
//!
//! - One attempt per call; failures surface as [`HttpError`]
//! - Client-wide default headers (GitHub needs `User-Agent` and `Accept`)
//! - Per-request bearer token and query parameters via [`RequestOpts`]
//! - GitHub `{message, errors[]}` bodies are folded into [`HttpError::Api`]
//! - Optional *raw* request/response logging via `DEPLOYLINK_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), deploylink_http::HttpError> {
//! let client = deploylink_http::HttpClient::new("https://api.example.com")?;
//! let got: serde_json::Value = client
//!     .get_json("v1/items", deploylink_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```
//!
//! Security: bearer tokens are sanitized before use. Logs show whether a
//! token was sent, never its value, and secret-looking query keys are redacted.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

const RAW_ENV: &str = "DEPLOYLINK_HTTP_RAW";
// 64 KiB
const RAW_MAX_BODY: usize = 64 * 1024;
const SNIPPET_MAX: usize = 500;
const REDACTED: &str = "<redacted>";

const SECRET_QUERY_KEYS: &[&str] = &[
    "access_token",
    "auth",
    "authorization",
    "client_secret",
    "jwt",
    "secret",
    "token",
];

static REQUEST_SEQ: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

impl HttpError {
    /// HTTP status for API errors, `None` for transport/build failures.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Per-request credentials and query string.
///
/// ```
/// use deploylink_http::RequestOpts;
/// use std::borrow::Cow;
///
/// let opts = RequestOpts {
///     bearer: Some("ghs_example"),
///     query: vec![("per_page", Cow::Borrowed("100"))],
/// };
/// assert_eq!(opts.query.len(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    /// Sent as `Authorization: Bearer <token>`.
    pub bearer: Option<&'a str>,
    pub query: Vec<(&'a str, Cow<'a, str>)>,
}

#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    default_headers: HeaderMap,
    timeout: Duration,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// A trailing slash is added to the base path so relative joins append
    /// rather than replace the last segment (GitHub Enterprise serves the API
    /// under `/api/v3`).
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let mut base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_headers: HeaderMap::new(),
            timeout: Duration::from_secs(15),
        })
    }

    /// Headers sent with every request.
    pub fn with_default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = headers;
        self
    }

    pub async fn get_json<T>(&self, path: &str, opts: RequestOpts<'_>) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        self.send_json::<(), T>(Method::GET, path, None, opts).await
    }

    pub async fn post_json<B, T>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::POST, path, Some(body), opts).await
    }

    pub async fn patch_json<B, T>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::PATCH, path, Some(body), opts).await
    }

    fn resolve(&self, path: &str) -> Result<Url, HttpError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| HttpError::Url(e.to_string()))
    }

    async fn send_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut url = self.resolve(path)?;
        if !opts.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(opts.query.iter().map(|(k, v)| (*k, v.as_ref())));
        }
        let payload = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| HttpError::Build(e.to_string()))?;

        let mut headers = self.default_headers.clone();
        if let Some(token) = opts.bearer {
            headers.insert(AUTHORIZATION, bearer_header(token)?);
        }
        if payload.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        let req_id = format!("r{}", REQUEST_SEQ.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(
            %req_id,
            %method,
            path = %url.path(),
            query = ?redact_query(&url),
            authenticated = opts.bearer.is_some(),
            has_body = payload.is_some(),
            "http.request.start"
        );
        if raw_enabled() {
            let curl = make_curl(&method, &url, &headers, payload.as_deref());
            tracing::debug!(target: "http.raw", %req_id, %curl, "request");
        }

        let mut rb = self
            .inner
            .request(method, url)
            .timeout(self.timeout)
            .headers(headers);
        if let Some(bytes) = payload {
            rb = rb.body(bytes);
        }

        let started = Instant::now();
        let resp = rb.send().await.map_err(|e| network_error(&req_id, e))?;
        let status = resp.status();
        let resp_headers = resp.headers().clone();
        let bytes = resp.bytes().await.map_err(|e| network_error(&req_id, e))?;

        let github_request_id = header_str(&resp_headers, "x-github-request-id")
            .unwrap_or("-")
            .to_string();
        tracing::debug!(
            %req_id,
            %status,
            duration_ms = started.elapsed().as_millis() as u64,
            body_len = bytes.len(),
            x_github_request_id = %github_request_id,
            rate_limit.remaining = ?header_str(&resp_headers, "x-ratelimit-remaining"),
            rate_limit.reset = ?header_str(&resp_headers, "x-ratelimit-reset"),
            "http.response.headers"
        );
        if raw_enabled() {
            let end = bytes.len().min(RAW_MAX_BODY);
            tracing::debug!(
                target: "http.raw",
                %req_id,
                %status,
                headers = ?redact_headers(&resp_headers),
                body = %String::from_utf8_lossy(&bytes[..end]),
                truncated = bytes.len() > RAW_MAX_BODY,
                "response"
            );
        }

        if status.is_success() {
            // 204 No Content decodes as JSON null.
            let body: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
            return serde_json::from_slice(body).map_err(|e| {
                let snippet = snip_body(&bytes);
                tracing::warn!(%req_id, error = %e, body_snippet = %snippet, "http.response.decode_error");
                HttpError::Decode(e.to_string(), snippet)
            });
        }

        let message = extract_error_message(&bytes);
        tracing::warn!(
            %req_id,
            %status,
            %message,
            x_github_request_id = %github_request_id,
            "http.error"
        );
        Err(HttpError::Api {
            status,
            message,
            request_id: github_request_id,
        })
    }
}

fn network_error(req_id: &str, err: reqwest::Error) -> HttpError {
    tracing::warn!(%req_id, error = %err, "http.network_error");
    HttpError::Network(err.to_string())
}

fn raw_enabled() -> bool {
    std::env::var(RAW_ENV)
        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn is_secret_key(key: &str) -> bool {
    SECRET_QUERY_KEYS.contains(&key.to_ascii_lowercase().as_str())
}

fn redact_query(url: &Url) -> Vec<(String, String)> {
    url.query_pairs()
        .map(|(k, v)| {
            let v = if is_secret_key(&k) { REDACTED.into() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect()
}

fn redact_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(k, v)| {
            let shown = if *k == AUTHORIZATION {
                REDACTED.to_string()
            } else {
                v.to_str().unwrap_or("<binary>").to_string()
            };
            (k.as_str().to_string(), shown)
        })
        .collect()
}

/// Shell-pasteable repro of a request, with credentials redacted.
fn make_curl(method: &Method, url: &Url, headers: &HeaderMap, body: Option<&[u8]>) -> String {
    let quote = |s: &str| format!("'{}'", s.replace('\'', r"'\''"));

    let mut shown = url.clone();
    if shown.query().is_some() {
        let pairs = redact_query(url);
        shown.query_pairs_mut().clear().extend_pairs(pairs);
    }

    let mut cmd = format!("curl -X{method}");
    for (name, value) in redact_headers(headers) {
        cmd.push_str(&format!(" -H {}", quote(&format!("{name}: {value}"))));
    }
    match body.map(std::str::from_utf8) {
        Some(Ok(text)) => {
            let cut = floor_char_boundary(text, RAW_MAX_BODY);
            cmd.push_str(&format!(" -d {}", quote(&text[..cut])));
        }
        Some(Err(_)) => cmd.push_str(" --data-binary @-"),
        None => {}
    }
    cmd.push(' ');
    cmd.push_str(&quote(shown.as_str()));
    cmd
}

/// Pull a human-readable message out of an error body.
///
/// GitHub answers with `{"message": "...", "errors": [...]}`; the first
/// nested error detail is appended when present.
fn extract_error_message(body: &[u8]) -> String {
    #[derive(Deserialize)]
    struct Envelope {
        #[serde(default)]
        message: String,
        #[serde(default)]
        errors: Vec<Detail>,
    }
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Detail {
        Text(String),
        Object {
            #[serde(default)]
            message: Option<String>,
            #[serde(default)]
            code: Option<String>,
            #[serde(default)]
            field: Option<String>,
        },
    }

    let Ok(envelope) = serde_json::from_slice::<Envelope>(body) else {
        return snip_body(body);
    };
    let detail = envelope.errors.into_iter().next().and_then(|d| match d {
        Detail::Text(s) => Some(s),
        Detail::Object {
            message,
            code,
            field,
        } => message.or_else(|| match (field, code) {
            (Some(f), Some(c)) => Some(format!("{f}: {c}")),
            (None, Some(c)) => Some(c),
            _ => None,
        }),
    });
    match (envelope.message.is_empty(), detail) {
        (false, Some(d)) => format!("{} ({d})", envelope.message),
        (false, None) => envelope.message,
        (true, Some(d)) => d,
        (true, None) => snip_body(body),
    }
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).into_owned();
    if snip.len() > SNIPPET_MAX {
        snip.truncate(floor_char_boundary(&snip, SNIPPET_MAX));
        snip.push_str("...");
    }
    snip
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Strip quotes and whitespace a secret store may leave around a token, then
/// build the `Authorization` value.
fn bearer_header(raw: &str) -> Result<HeaderValue, HttpError> {
    let token: String = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if token.is_empty() {
        return Err(HttpError::Build("bearer token is empty".into()));
    }
    if !token.is_ascii() || token.chars().any(|c| c.is_ascii_control()) {
        return Err(HttpError::Build(
            "bearer token contains non-printable or non-ASCII characters".into(),
        ));
    }
    let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|e| HttpError::Build(format!("invalid Authorization header: {e}")))?;
    value.set_sensitive(true);
    Ok(value)
}
