//! Collect every stylesheet a page uses, in cascade order.
//!
//! Given a URL, the walker fetches the document and gathers, in the order
//! the cascade sees them:
//! - `<link rel="stylesheet">` targets
//! - `<style>` element contents
//! - `style="..."` attribute values
//! - everything those stylesheets `@import`, recursively
//!
//! Each fragment comes back as a [`CssOrigin`](csscrape_css::CssOrigin)
//! recording where it was found. A stylesheet that cannot be fetched is
//! reported in [`ScrapeResult::skipped`] instead of failing the scrape.
//!
//! # Example
//! ```ignore
//! let walker = Walker::new(HttpFetcher::new(&FetchConfig::default())?);
//! let result = walker.get_css("example.com")?;
//! print!("{}", result.css());
//! ```

/// Stylesheet sources in an HTML document.
pub mod document;
/// Errors that abort a scrape.
pub mod error;
/// Scrape output.
pub mod result;
/// The concurrent stylesheet walk.
pub mod walker;

use csscrape_common::net::{FetchConfig, HttpFetcher};

pub use document::{DocumentStyle, DocumentStyles, scan_document};
pub use error::ScrapeError;
pub use result::{ScrapeResult, SkipReason, SkippedReference};
pub use walker::{ScrapeRequest, WalkLimits, Walker};

/// Scrape `root_url` over HTTP with default settings.
///
/// # Errors
///
/// See [`Walker::scrape`]. A failure to build the HTTP client is reported as
/// [`ScrapeError::RootFetch`].
pub fn get_css(root_url: &str) -> Result<ScrapeResult, ScrapeError> {
    let fetcher = HttpFetcher::new(&FetchConfig::default()).map_err(ScrapeError::RootFetch)?;
    Walker::new(fetcher).get_css(root_url)
}
