//! Finding stylesheet references in an HTML document.
//!
//! [§ 4.2.4 The link element](https://html.spec.whatwg.org/multipage/semantics.html#the-link-element)
//! [§ 4.2.6 The style element](https://html.spec.whatwg.org/multipage/semantics.html#the-style-element)
//! [§ 3.2.6 The style attribute](https://html.spec.whatwg.org/multipage/dom.html#the-style-attribute)

use csscrape_common::url::resolve_against;
use scraper::{ElementRef, Html};
use url::Url;

/// A source of CSS found in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentStyle {
    /// `<link rel="stylesheet" href="...">`, not yet resolved or fetched.
    Link {
        /// The `href` attribute, as written.
        href: String,
        /// The `media` attribute, if present.
        media: Option<String>,
        /// The `rel` attribute, as written.
        rel: String,
    },
    /// The text content of a `<style>` element.
    Style(String),
    /// The value of a `style` attribute.
    Inline(String),
}

/// The CSS sources of one document, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentStyles {
    /// [§ 4.2.3 The base element](https://html.spec.whatwg.org/multipage/semantics.html#the-base-element)
    ///
    /// The URL `<link>` hrefs resolve against: the first `<base href>` if
    /// there is one that resolves, the document URL otherwise.
    pub base_url: Url,
    /// Stylesheet sources in document order.
    pub styles: Vec<DocumentStyle>,
}

/// Parse `html` and collect its CSS sources in document order.
///
/// [§ 6.1 Cascade Sorting Order](https://www.w3.org/TR/css-cascade-4/#cascade-sort)
/// "The last declaration in document order wins."
///
/// An element that is both a source and has a `style` attribute (a
/// `<style style="...">`, say) yields its element source first.
#[must_use]
pub fn scan_document(html: &str, document_url: &Url) -> DocumentStyles {
    let document = Html::parse_document(html);
    let mut base_url = None;
    let mut styles = Vec::new();

    // Pre-order traversal visits elements in document order.
    for node in document.tree.root().descendants() {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        let data = element.value();

        match data.name() {
            // [§ 4.2.3](https://html.spec.whatwg.org/multipage/semantics.html#the-base-element)
            // "The base element allows authors to specify the document base URL...
            // There must be no more than one base element per document."
            "base" if base_url.is_none() => {
                base_url = data
                    .attr("href")
                    .and_then(|href| resolve_against(href, document_url));
            }

            // STEP 1: "If the rel attribute's value contains the token
            // stylesheet, then the link is a stylesheet link."
            //
            // STEP 2: "The href attribute gives the address (a valid non-empty
            // URL potentially surrounded by spaces) of the linked resource."
            "link" => {
                if let (Some(rel), Some(href)) = (data.attr("rel"), data.attr("href")) {
                    if is_stylesheet_rel(rel) && !href.trim().is_empty() {
                        styles.push(DocumentStyle::Link {
                            href: href.to_string(),
                            media: data.attr("media").map(str::to_string),
                            rel: rel.to_string(),
                        });
                    }
                }
            }

            // "The style element allows authors to embed CSS style sheets in
            // their documents."
            "style" => {
                let css: String = element.text().collect();
                styles.push(DocumentStyle::Style(css));
            }

            _ => {}
        }

        if let Some(declarations) = data.attr("style") {
            styles.push(DocumentStyle::Inline(declarations.to_string()));
        }
    }

    DocumentStyles {
        base_url: base_url.unwrap_or_else(|| document_url.clone()),
        styles,
    }
}

/// [§ 2.4.7 Space-separated tokens](https://html.spec.whatwg.org/multipage/common-microsyntaxes.html#space-separated-tokens)
///
/// Token comparison is ASCII case-insensitive, so `rel="Alternate StyleSheet"`
/// counts.
fn is_stylesheet_rel(rel: &str) -> bool {
    rel.split_ascii_whitespace()
        .any(|token| token.eq_ignore_ascii_case("stylesheet"))
}
