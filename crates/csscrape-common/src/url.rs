//! URL resolution utilities.
//!
//! [URL Standard](https://url.spec.whatwg.org/)
//! [§ 2.5 URLs](https://html.spec.whatwg.org/multipage/urls-and-fetching.html#resolving-urls)
//!
//! Every absolute URL the scraper works with is produced here. Nothing else
//! in the workspace builds a [`Url`] out of raw text.

use std::sync::LazyLock;

use ::url::Url;
use regex::Regex;

/// A bare, scheme-less host like `example.com` or `www.example.co.uk/path?q`.
///
/// One or more label characters, a dot, an alphabetic TLD of two or more
/// letters, then optionally a path, query, or fragment.
static BARE_DOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9.-]+\.[A-Za-z]{2,}(?:[/?#].*)?$").expect("bare domain pattern is valid")
});

/// Resolve a possibly partial URL, optionally against a base URL.
///
/// # Algorithm
///
/// With a base:
///
/// STEP 1: Parse `base`. Fail if it does not parse or has no host.
///
/// STEP 2: "Otherwise, resolve url relative to base." Dot segments collapse,
/// `//host/path` picks up the base scheme, query and fragment are kept.
///
/// Without a base:
///
/// STEP 1: "If url is an absolute URL, return url."
///
/// STEP 2: If `url` looks like a bare domain, prefix `https://`.
///
/// STEP 3: Otherwise fail. This rejects `""`, single labels like `example`,
/// protocol-relative `//example.com` (no scheme to borrow), and arbitrary
/// text such as CSS.
///
/// Never panics; any parse failure is `None`.
#[must_use]
pub fn resolve(url: &str, base: Option<&str>) -> Option<Url> {
    match base {
        Some(base) => {
            let base = Url::parse(base).ok()?;
            resolve_against(url, &base)
        }
        None => resolve_absolute(url),
    }
}

/// Resolve `url` against an already parsed `base`.
///
/// Same rules as [`resolve`] with a base: a base without a host (`data:`,
/// `mailto:`, ...) cannot anchor relative references and yields `None`.
#[must_use]
pub fn resolve_against(url: &str, base: &Url) -> Option<Url> {
    if base.host_str().is_none_or(str::is_empty) {
        return None;
    }
    base.join(url).ok()
}

/// Resolve a URL that has no base to lean on.
fn resolve_absolute(url: &str) -> Option<Url> {
    // STEP 1: A fully qualified URL parses on its own.
    //
    // [URL Standard § 4.3](https://url.spec.whatwg.org/#url-parsing)
    // "An absolute-URL string is a URL-scheme string, followed by U+003A (:),
    // followed by a scheme-specific part."
    if let Ok(parsed) = Url::parse(url) {
        return Some(parsed);
    }

    // STEP 2: Accept something that looks like a domain typed into an
    // address bar.
    if BARE_DOMAIN.is_match(url) {
        return Url::parse(&format!("https://{url}")).ok();
    }

    None
}
