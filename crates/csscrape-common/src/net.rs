//! HTTP fetch utilities for the scraper.
//!
//! The walker only ever talks to the network through the [`Fetcher`] trait.
//! [`HttpFetcher`] is the real implementation: a blocking `reqwest` client
//! with a timeout, a browser-like User-Agent, and a body size cap. Tests and
//! offline runs plug in their own implementations.
//!
//! TODO: Implement proper Fetch Standard (<https://fetch.spec.whatwg.org/>)
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use percent_encoding::percent_decode_str;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use url::Url;

/// User-Agent header sent with all requests.
///
/// Mimics a common desktop browser to avoid basic bot detection.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default cap on a response body, in bytes.
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Settings for [`HttpFetcher`].
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Per-request timeout, connect through body.
    pub timeout: Duration,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
    /// Responses larger than this are rejected with [`FetchError::TooLarge`].
    pub max_body_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Why a single fetch failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("failed to create HTTP client: {0}")]
    Client(String),
    /// Connection, TLS, DNS, or redirect failure.
    #[error("request to {url} failed: {message}")]
    Network {
        /// The URL that was requested.
        url: Url,
        /// Underlying error text.
        message: String,
    },
    /// The request did not finish within the configured timeout.
    #[error("request to {url} timed out")]
    Timeout {
        /// The URL that was requested.
        url: Url,
    },
    /// The server answered with a non-success status.
    #[error("HTTP error {status} from {url}")]
    Status {
        /// The URL that was requested.
        url: Url,
        /// The HTTP status code.
        status: u16,
    },
    /// The body exceeded [`FetchConfig::max_body_bytes`].
    #[error("response from {url} exceeds {limit} bytes")]
    TooLarge {
        /// The URL that was requested.
        url: Url,
        /// The configured cap.
        limit: usize,
    },
    /// The body could not be read or decoded as text.
    #[error("failed to read response body from {url}: {message}")]
    Body {
        /// The URL that was requested.
        url: Url,
        /// Underlying error text.
        message: String,
    },
    /// A `data:` URL could not be decoded.
    #[error("invalid data URL: {0}")]
    DataUrl(String),
}

impl FetchError {
    /// The HTTP status code, when the failure was a non-success response.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Client(_)
            | Self::Network { .. }
            | Self::Timeout { .. }
            | Self::TooLarge { .. }
            | Self::Body { .. }
            | Self::DataUrl(_) => None,
        }
    }
}

/// A successfully fetched text resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResource {
    /// The final URL after redirects. Relative references inside the body
    /// resolve against this, not against the requested URL.
    pub url: Url,
    /// The `Content-Type` header, if the server sent one.
    pub content_type: Option<String>,
    /// The decoded body text.
    pub body: String,
}

impl FetchedResource {
    /// The MIME essence of the content type (`text/css` for
    /// `text/css; charset=utf-8`), lowercased.
    #[must_use]
    pub fn mime_essence(&self) -> Option<String> {
        let content_type = self.content_type.as_deref()?;
        let essence = content_type.split(';').next()?.trim();
        if essence.is_empty() {
            None
        } else {
            Some(essence.to_ascii_lowercase())
        }
    }
}

/// Something that can retrieve a text resource by absolute URL.
///
/// Implementations must be shareable across the walker's fetch threads.
pub trait Fetcher: Send + Sync {
    /// Fetch `url` and return its body as text.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] if the resource cannot be retrieved or the
    /// server answers with a non-success status.
    fn fetch(&self, url: &Url) -> Result<FetchedResource, FetchError>;
}

impl<T: Fetcher + ?Sized> Fetcher for &T {
    fn fetch(&self, url: &Url) -> Result<FetchedResource, FetchError> {
        (**self).fetch(url)
    }
}

impl<T: Fetcher + ?Sized> Fetcher for Box<T> {
    fn fetch(&self, url: &Url) -> Result<FetchedResource, FetchError> {
        (**self).fetch(url)
    }
}

impl<T: Fetcher + ?Sized> Fetcher for Arc<T> {
    fn fetch(&self, url: &Url) -> Result<FetchedResource, FetchError> {
        (**self).fetch(url)
    }
}

/// [`Fetcher`] backed by a blocking `reqwest` client.
///
/// Build it outside of any async runtime; the blocking client owns its own.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    max_body_bytes: usize,
}

impl HttpFetcher {
    /// Create a fetcher from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the HTTP client cannot be created.
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            max_body_bytes: config.max_body_bytes,
        })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<FetchedResource, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| classify_request_error(url, &e))?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.clone(),
                status: response.status().as_u16(),
            });
        }

        // Reject early when the server announces an oversized body; the
        // capped read below covers chunked responses.
        if response
            .content_length()
            .is_some_and(|len| len > self.max_body_bytes as u64)
        {
            return Err(FetchError::TooLarge {
                url: url.clone(),
                limit: self.max_body_bytes,
            });
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        // Read at most one byte past the cap; anything more is never pulled
        // off the wire.
        let mut bytes = Vec::new();
        let _ = response
            .take(self.max_body_bytes as u64 + 1)
            .read_to_end(&mut bytes)
            .map_err(|e| FetchError::Body {
                url: url.clone(),
                message: e.to_string(),
            })?;

        if bytes.len() > self.max_body_bytes {
            return Err(FetchError::TooLarge {
                url: url.clone(),
                limit: self.max_body_bytes,
            });
        }

        let body = String::from_utf8(bytes)
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned());

        Ok(FetchedResource {
            url: final_url,
            content_type,
            body,
        })
    }
}

/// Map a `reqwest` error onto the matching [`FetchError`] variant.
fn classify_request_error(url: &Url, error: &reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout { url: url.clone() }
    } else if error.is_body() || error.is_decode() {
        FetchError::Body {
            url: url.clone(),
            message: error.to_string(),
        }
    } else {
        FetchError::Network {
            url: url.clone(),
            message: error.to_string(),
        }
    }
}

/// A parsed `data:` URL that can be decoded into text.
///
/// [RFC 2397](https://www.rfc-editor.org/rfc/rfc2397)
///
/// `data:[<mediatype>][;base64],<data>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    /// The media type, `text/plain;charset=US-ASCII` when omitted.
    pub media_type: String,
    /// Whether the payload is base64 encoded.
    pub base64: bool,
    /// The raw, still encoded payload after the comma.
    pub payload: String,
}

impl DataUrl {
    /// Parse a `data:` URL.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::DataUrl`] if the scheme is not `data` or the
    /// comma separating metadata and payload is missing.
    pub fn parse(url: &Url) -> Result<Self, FetchError> {
        if url.scheme() != "data" {
            return Err(FetchError::DataUrl(format!("not a data URL: {url}")));
        }

        // The path of a data URL is everything after "data:", fragment excluded.
        let rest = url.path();
        let Some((metadata, payload)) = rest.split_once(',') else {
            return Err(FetchError::DataUrl("missing comma".to_string()));
        };

        let (media_type, base64) = match metadata.strip_suffix(";base64") {
            Some(media_type) => (media_type, true),
            None => (metadata, false),
        };
        let media_type = if media_type.trim().is_empty() {
            "text/plain;charset=US-ASCII".to_string()
        } else {
            media_type.trim().to_string()
        };

        // The query is part of the payload for data URLs.
        let payload = match url.query() {
            Some(query) => format!("{payload}?{query}"),
            None => payload.to_string(),
        };

        Ok(Self {
            media_type,
            base64,
            payload,
        })
    }

    /// Decode the payload into text.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::DataUrl`] if base64 decoding fails or the
    /// decoded bytes are not UTF-8.
    pub fn decode_text(&self) -> Result<String, FetchError> {
        let bytes = if self.base64 {
            let compact: String = percent_decode_str(&self.payload)
                .decode_utf8_lossy()
                .chars()
                .filter(|c| !c.is_ascii_whitespace())
                .collect();
            base64::engine::general_purpose::STANDARD
                .decode(compact)
                .map_err(|e| FetchError::DataUrl(format!("base64 decode error: {e}")))?
        } else {
            percent_decode_str(&self.payload).collect()
        };

        String::from_utf8(bytes)
            .map_err(|e| FetchError::DataUrl(format!("payload is not UTF-8: {e}")))
    }

    /// Decode the data URL into a resource as if it had been fetched.
    ///
    /// # Errors
    ///
    /// Same as [`DataUrl::parse`] and [`DataUrl::decode_text`].
    pub fn fetch(url: &Url) -> Result<FetchedResource, FetchError> {
        let data_url = Self::parse(url)?;
        let body = data_url.decode_text()?;
        Ok(FetchedResource {
            url: url.clone(),
            content_type: Some(data_url.media_type),
            body,
        })
    }
}
