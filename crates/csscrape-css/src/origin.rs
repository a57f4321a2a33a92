//! [§ 6.1 Cascade Sorting Order](https://www.w3.org/TR/css-cascade-4/#cascade-sort)
//!
//! "Declarations from style sheets independently linked by the originating
//! document are treated as if they were concatenated in linking order."
//!
//! Every fragment of CSS the scraper collects is wrapped in a [`CssOrigin`]
//! that records where it was found. Origins are plain immutable data; a
//! sequence of them in discovery order is the result of a scrape.

use std::borrow::Cow;

use serde::Serialize;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};
use url::Url;

use crate::urls::absolutize_urls;

/// The kind of an origin, without its payload.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum OriginKind {
    /// CSS handed to the scraper directly.
    LocalFile,
    /// A stylesheet fetched by URL directly.
    File,
    /// A stylesheet pulled in by `@import`.
    Import,
    /// A stylesheet from `<link rel="stylesheet">`.
    Link,
    /// The contents of a `<style>` element.
    Style,
    /// The value of a `style="..."` attribute.
    Inline,
}

/// CSS supplied by the caller, not fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalFileOrigin {
    /// Caller-chosen label, usually a file name.
    pub name: String,
    /// The CSS text.
    pub css: String,
}

/// CSS fetched from a direct stylesheet URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOrigin {
    /// The stylesheet URL.
    pub href: Url,
    /// The CSS text.
    pub css: String,
}

/// CSS pulled in by an `@import` rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportOrigin {
    /// The reference as written in the importing stylesheet.
    pub href: String,
    /// The CSS text.
    pub css: String,
    /// `href` resolved against the importing stylesheet.
    pub url: Url,
}

/// [§ 4.2.4 The link element](https://html.spec.whatwg.org/multipage/semantics.html#the-link-element)
///
/// A stylesheet link before its body has been fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkResource {
    /// The `href` attribute as written.
    pub href: String,
    /// `href` resolved against the document base URL.
    pub url: Url,
    /// The `media` attribute, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    /// The `rel` attribute as written.
    pub rel: String,
}

impl LinkResource {
    /// Attach the fetched stylesheet body.
    #[must_use]
    pub fn with_css(self, css: String) -> LinkOrigin {
        LinkOrigin {
            href: self.href,
            url: self.url,
            media: self.media,
            rel: self.rel,
            css,
        }
    }
}

/// CSS from a `<link rel="stylesheet">` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkOrigin {
    /// The `href` attribute as written.
    pub href: String,
    /// `href` resolved against the document base URL.
    pub url: Url,
    /// The `media` attribute, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    /// The `rel` attribute as written.
    pub rel: String,
    /// The CSS text.
    pub css: String,
}

/// [§ 4.2.6 The style element](https://html.spec.whatwg.org/multipage/semantics.html#the-style-element)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyleOrigin {
    /// The element's text content.
    pub css: String,
    /// The document base URL: the first `<base href>`, or the page URL.
    pub url: Url,
}

/// [§ 3.2.6 The style attribute](https://html.spec.whatwg.org/multipage/dom.html#the-style-attribute)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineOrigin {
    /// The attribute value, a declaration list.
    pub css: String,
    /// The document base URL: the first `<base href>`, or the page URL.
    pub url: Url,
}

/// One unit of discovered CSS and its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CssOrigin {
    /// See [`LocalFileOrigin`].
    LocalFile(LocalFileOrigin),
    /// See [`FileOrigin`].
    File(FileOrigin),
    /// See [`ImportOrigin`].
    Import(ImportOrigin),
    /// See [`LinkOrigin`].
    Link(LinkOrigin),
    /// See [`StyleOrigin`].
    Style(StyleOrigin),
    /// See [`InlineOrigin`].
    Inline(InlineOrigin),
}

impl CssOrigin {
    /// The CSS text attributed to this origin.
    #[must_use]
    pub fn css(&self) -> &str {
        match self {
            Self::LocalFile(origin) => &origin.css,
            Self::File(origin) => &origin.css,
            Self::Import(origin) => &origin.css,
            Self::Link(origin) => &origin.css,
            Self::Style(origin) => &origin.css,
            Self::Inline(origin) => &origin.css,
        }
    }

    /// Which kind of origin this is.
    #[must_use]
    pub const fn kind(&self) -> OriginKind {
        match self {
            Self::LocalFile(_) => OriginKind::LocalFile,
            Self::File(_) => OriginKind::File,
            Self::Import(_) => OriginKind::Import,
            Self::Link(_) => OriginKind::Link,
            Self::Style(_) => OriginKind::Style,
            Self::Inline(_) => OriginKind::Inline,
        }
    }

    /// The URL relative references inside [`css`](Self::css) resolve
    /// against. `None` for CSS the caller supplied without a location.
    #[must_use]
    pub const fn context_url(&self) -> Option<&Url> {
        match self {
            Self::LocalFile(_) => None,
            Self::File(origin) => Some(&origin.href),
            Self::Import(origin) => Some(&origin.url),
            Self::Link(origin) => Some(&origin.url),
            Self::Style(origin) => Some(&origin.url),
            Self::Inline(origin) => Some(&origin.url),
        }
    }

    /// The CSS with every embedded URL made absolute against
    /// [`context_url`](Self::context_url). Borrowed unchanged when there is
    /// no context URL.
    #[must_use]
    pub fn absolute_css(&self) -> Cow<'_, str> {
        match self.context_url() {
            Some(base) => Cow::Owned(absolutize_urls(self.css(), base)),
            None => Cow::Borrowed(self.css()),
        }
    }
}

impl From<LinkOrigin> for CssOrigin {
    fn from(origin: LinkOrigin) -> Self {
        Self::Link(origin)
    }
}

impl From<ImportOrigin> for CssOrigin {
    fn from(origin: ImportOrigin) -> Self {
        Self::Import(origin)
    }
}
