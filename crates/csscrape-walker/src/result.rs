//! The value a scrape returns.

use core::fmt::Display;

use csscrape_common::net::FetchError;
use csscrape_css::{CssOrigin, OriginKind};
use serde::{Serialize, Serializer};
use thiserror::Error;
use url::Url;

/// Everything one scrape found, in cascade order, plus what it had to skip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScrapeResult {
    /// Discovered CSS, in discovery order. Later entries override earlier
    /// ones under normal cascade rules, so this order is significant.
    pub origins: Vec<CssOrigin>,
    /// References that were found but produced no origin.
    pub skipped: Vec<SkippedReference>,
}

impl ScrapeResult {
    /// Concatenate the CSS of every origin, in order.
    #[must_use]
    pub fn css(&self) -> String {
        self.origins.iter().map(CssOrigin::css).collect()
    }

    /// Concatenate the CSS of every origin after making its embedded URLs
    /// absolute against that origin's own location.
    #[must_use]
    pub fn absolute_css(&self) -> String {
        self.origins
            .iter()
            .map(|origin| origin.absolute_css().into_owned())
            .collect()
    }

    /// Origins of one kind, in order.
    pub fn origins_of(&self, kind: OriginKind) -> impl Iterator<Item = &CssOrigin> {
        self.origins.iter().filter(move |origin| origin.kind() == kind)
    }
}

/// A stylesheet reference that was discovered but not collected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedReference {
    /// What kind of origin it would have become.
    pub kind: OriginKind,
    /// The reference as written.
    pub href: String,
    /// The resolved URL, when resolution succeeded.
    pub url: Option<Url>,
    /// Why it was skipped.
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Why a reference was skipped.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum SkipReason {
    /// The reference could not be resolved to an absolute URL.
    #[error("could not resolve the reference to an absolute url")]
    UnresolvableUrl,

    /// The fetch failed.
    #[error("{error}")]
    Fetch {
        /// The underlying failure.
        #[serde(serialize_with = "serialize_display")]
        error: FetchError,
    },

    /// The response was not a stylesheet.
    #[error("{message}")]
    Parse {
        /// What was wrong with it.
        message: String,
    },

    /// The reference was nested deeper than the configured maximum.
    #[error("nested deeper than {limit} stylesheets")]
    DepthLimit {
        /// The configured maximum depth.
        limit: usize,
    },

    /// The scrape already fetched the configured maximum of stylesheets.
    #[error("more than {limit} stylesheets fetched")]
    FetchLimit {
        /// The configured maximum fetch count.
        limit: usize,
    },
}

fn serialize_display<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}
