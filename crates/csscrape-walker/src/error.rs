//! Errors that abort a whole scrape.
//!
//! Failures of individual stylesheets never end up here; they are recorded
//! as [`SkippedReference`](crate::SkippedReference)s and the walk carries on.

use csscrape_common::net::FetchError;
use thiserror::Error;
use url::Url;

/// Error type for a scrape.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScrapeError {
    /// The root URL could not be resolved to an absolute URL.
    #[error("invalid url `{input}`: specify a url like https://example.com or example.com")]
    InvalidRootUrl {
        /// The text the caller passed in.
        input: String,
    },

    /// The root document could not be fetched.
    #[error("failed to fetch the page: {0}")]
    RootFetch(#[source] FetchError),

    /// The root document is neither HTML nor a stylesheet.
    #[error("{url} is not an HTML document or stylesheet (content type `{content_type}`)")]
    RootParse {
        /// The final URL of the root document.
        url: Url,
        /// The content type the server reported.
        content_type: String,
    },
}

impl ScrapeError {
    /// The HTTP status this error maps to, when it has a well-known one.
    ///
    /// Bad input maps to `400` and an upstream error status is passed
    /// through. Everything else returns `None` and should be treated as an
    /// internal failure.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::InvalidRootUrl { .. } => Some(400),
            Self::RootFetch(error) => error.status(),
            Self::RootParse { .. } => None,
        }
    }
}
