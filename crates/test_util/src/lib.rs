//! In-memory [`Fetcher`] fixtures for csscrape tests.
//!
//! [`StaticSite`] answers requests from a table of canned responses and
//! records every URL it was asked for, so tests can assert on fetch counts
//! and simulate slow or failing servers without a network.

use std::collections::HashMap;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use csscrape_common::net::{FetchError, FetchedResource, Fetcher};
use url::Url;

/// A canned response.
#[derive(Debug, Clone)]
pub enum Route {
    /// Answer `200` with this content type and body.
    Ok {
        /// `Content-Type` header value, if any.
        content_type: Option<String>,
        /// Response body.
        body: String,
        /// Artificial latency before answering.
        delay: Duration,
    },
    /// Answer with this HTTP status.
    Status(u16),
    /// Answer `200` after redirecting to another URL.
    Redirect(String),
}

/// A fake website keyed by absolute URL.
#[derive(Debug, Default)]
pub struct StaticSite {
    routes: HashMap<String, Route>,
    requests: Mutex<Vec<String>>,
}

impl StaticSite {
    /// Create a site with no pages.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` as `text/html` at `url`.
    #[must_use]
    pub fn html(self, url: &str, body: &str) -> Self {
        self.route(url, "text/html; charset=utf-8", body, Duration::ZERO)
    }

    /// Serve `body` as `text/css` at `url`.
    #[must_use]
    pub fn css(self, url: &str, body: &str) -> Self {
        self.route(url, "text/css", body, Duration::ZERO)
    }

    /// Serve `body` as `text/css` at `url` after `delay`.
    #[must_use]
    pub fn slow_css(self, url: &str, body: &str, delay: Duration) -> Self {
        self.route(url, "text/css", body, delay)
    }

    /// Serve `body` with an arbitrary content type.
    #[must_use]
    pub fn route(mut self, url: &str, content_type: &str, body: &str, delay: Duration) -> Self {
        let content_type = if content_type.is_empty() {
            None
        } else {
            Some(content_type.to_string())
        };
        let _ = self.routes.insert(
            normalize(url),
            Route::Ok {
                content_type,
                body: body.to_string(),
                delay,
            },
        );
        self
    }

    /// Answer `url` with an HTTP error status.
    #[must_use]
    pub fn status(mut self, url: &str, status: u16) -> Self {
        let _ = self.routes.insert(normalize(url), Route::Status(status));
        self
    }

    /// Redirect `from` to `to`; the response for `to` is served with
    /// `to` as the final URL.
    #[must_use]
    pub fn redirect(mut self, from: &str, to: &str) -> Self {
        let _ = self
            .routes
            .insert(normalize(from), Route::Redirect(normalize(to)));
        self
    }

    /// Every URL requested so far, in request order.
    ///
    /// # Panics
    ///
    /// Panics if a fetch thread panicked while holding the request log.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// How many times `url` was requested.
    #[must_use]
    pub fn request_count(&self, url: &str) -> usize {
        let url = normalize(url);
        self.requests().iter().filter(|r| **r == url).count()
    }

    fn answer(&self, requested: &Url, key: &str, hops: usize) -> Result<FetchedResource, FetchError> {
        match self.routes.get(key) {
            Some(Route::Ok {
                content_type,
                body,
                delay,
            }) => {
                if !delay.is_zero() {
                    thread::sleep(*delay);
                }
                let final_url = Url::parse(key).map_err(|e| FetchError::Network {
                    url: requested.clone(),
                    message: e.to_string(),
                })?;
                Ok(FetchedResource {
                    url: final_url,
                    content_type: content_type.clone(),
                    body: body.clone(),
                })
            }
            Some(Route::Status(status)) => Err(FetchError::Status {
                url: requested.clone(),
                status: *status,
            }),
            Some(Route::Redirect(target)) if hops < 10 => self.answer(requested, target, hops + 1),
            Some(Route::Redirect(_)) => Err(FetchError::Network {
                url: requested.clone(),
                message: "too many redirects".to_string(),
            }),
            None => Err(FetchError::Status {
                url: requested.clone(),
                status: 404,
            }),
        }
    }
}

impl Fetcher for StaticSite {
    fn fetch(&self, url: &Url) -> Result<FetchedResource, FetchError> {
        let key = url.to_string();
        self.requests.lock().unwrap().push(key.clone());
        self.answer(url, &key, 0)
    }
}

/// Canonical string form used as the routing key.
fn normalize(url: &str) -> String {
    Url::parse(url).map_or_else(|_| url.to_string(), |parsed| parsed.to_string())
}
