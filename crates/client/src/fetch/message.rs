//! Request and response values exchanged with the network and the bucket.
//!
//! A `Response` body is an immutable `Bytes` buffer, so storing a copy and
//! returning the original never consumes the same stream twice.

use bytes::Bytes;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use shelter_core::{CachedEntry, Error};
use url::Url;

use super::url::request_key;

/// Request mode, as reported by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestMode {
    /// Top-level document load.
    Navigate,
    SameOrigin,
    NoCors,
    #[default]
    Cors,
}

/// An intercepted request.
#[derive(Debug, Clone)]
pub struct Request {
    pub url: Url,
    pub method: Method,
    pub mode: RequestMode,
}

impl Request {
    /// A subresource GET (stylesheet, script, image, ...).
    pub fn get(url: Url) -> Self {
        Self { url, method: Method::GET, mode: RequestMode::default() }
    }

    /// A top-level document load.
    pub fn navigate(url: Url) -> Self {
        Self { url, method: Method::GET, mode: RequestMode::Navigate }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Key this request's response is stored under.
    pub fn key(&self) -> String {
        request_key(&self.url)
    }
}

/// A response from the network or from a bucket.
#[derive(Debug, Clone)]
pub struct Response {
    /// URL the response was served from (after redirects)
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn new(url: Url, status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self { url, status, headers: HeaderMap::new(), body: body.into() }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Whether the status is 2xx.
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Copy of this response as a bucket entry.
    ///
    /// Header values that are not valid UTF-8 are dropped.
    pub fn to_entry(&self, bucket: &str, request_key: &str) -> CachedEntry {
        let pairs: Vec<(&str, &str)> = self
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
            .collect();
        let headers_json = if pairs.is_empty() { None } else { serde_json::to_string(&pairs).ok() };

        CachedEntry::new(
            bucket,
            request_key,
            self.status.as_u16(),
            self.content_type().map(str::to_string),
            headers_json,
            self.body.to_vec(),
        )
        .with_url(self.url.as_str())
    }

    /// Rebuild a response from a stored entry.
    pub fn from_entry(entry: CachedEntry) -> Result<Self, Error> {
        let url = Url::parse(&entry.url).map_err(|e| Error::InvalidUrl(format!("{}: {e}", entry.url)))?;
        let status = StatusCode::from_u16(entry.status_code)
            .map_err(|e| Error::InvalidInput(format!("stored status {}: {e}", entry.status_code)))?;

        let mut headers = HeaderMap::new();
        if let Some(json) = entry.headers_json.as_deref() {
            let pairs: Vec<(String, String)> = serde_json::from_str(json)
                .map_err(|e| Error::InvalidInput(format!("stored headers for {}: {e}", entry.request_key)))?;
            for (name, value) in pairs {
                if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(&value)) {
                    headers.append(name, value);
                }
            }
        }

        Ok(Self { url, status, headers, body: Bytes::from(entry.body) })
    }
}
