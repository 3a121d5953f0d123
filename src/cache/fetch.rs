use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// HTTP request timeout in seconds.
/// 30s allows for slow responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Body of the synthesized offline response
const OFFLINE_BODY: &str = "Offline - resource unavailable";

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// An outbound request as seen by the interception point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub method: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: "POST".to_string(),
            url: url.into(),
            body: Some(body.into()),
        }
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    /// True for http(s) URLs and root-relative paths (same-origin requests
    /// arrive scheme-less). Other schemes bypass the cache entirely.
    pub fn is_http(&self) -> bool {
        self.url.starts_with("http://")
            || self.url.starts_with("https://")
            || self.url.starts_with('/')
    }

    /// URL path component. Relative URLs are treated as paths already;
    /// absolute URLs are stripped of scheme and host.
    pub fn path(&self) -> &str {
        let without_scheme = self
            .url
            .strip_prefix("https://")
            .or_else(|| self.url.strip_prefix("http://"));
        match without_scheme {
            Some(rest) => rest.find('/').map(|i| &rest[i..]).unwrap_or("/"),
            None => &self.url,
        }
    }

    /// Heuristic for full-page navigations: a GET whose final path segment
    /// has no file extension. Stands in for the environment's navigation
    /// mode flag.
    pub fn is_navigation(&self) -> bool {
        if !self.is_get() {
            return false;
        }
        let path = self.path();
        let last_segment = path.rsplit('/').next().unwrap_or("");
        !last_segment.contains('.')
    }
}

/// A response as stored in and served from the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResponse {
    pub status: u16,
    #[serde(rename = "contentType", default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Synthesized 503 returned when both network and cache come up empty
    pub fn service_unavailable() -> Self {
        Self {
            status: 503,
            content_type: Some("text/plain".to_string()),
            body: OFFLINE_BODY.as_bytes().to_vec(),
        }
    }

    pub fn json(value: &serde_json::Value) -> Self {
        Self {
            status: 200,
            content_type: Some("application/json".to_string()),
            body: value.to_string().into_bytes(),
        }
    }
}

/// Network seam for the caching layer. Production uses `HttpFetcher`;
/// tests script their own implementations.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError>;
}

/// reqwest-backed fetcher.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| FetchError::InvalidRequest(format!("bad method '{}'", request.method)))?;

        let mut builder = self.client.request(method, &request.url);
        if let Some(ref body) = request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = response.bytes().await?.to_vec();

        Ok(FetchResponse {
            status,
            content_type,
            body,
        })
    }
}
