//! Rewrite the URLs embedded in a stylesheet to absolute form.
//!
//! [CSS Values 4 § 4.5.1 Relative URLs](https://www.w3.org/TR/css-values-4/#relative-urls)
//!
//! "Relative URLs are resolved to full URLs using the base URL of the style
//! sheet the value appears in." Once fragments from many origins are
//! concatenated that base is lost, so the scraper can bake it in first.

use csscrape_common::url::resolve_against;
use url::Url;

use crate::imports::next_significant;
use crate::lexer::{CssToken, tokenize};

/// Rewrite every `url(...)` reference and every `@import "..."` string in
/// `css` to an absolute URL resolved against `base`.
///
/// Rewritten references are emitted as `url("...")` (or `"..."` for the
/// `@import` string form). References that are fragment-only (`url(#clip)`),
/// `data:` URLs, or that do not resolve are left exactly as written, and so
/// is all other text.
#[must_use]
pub fn absolutize_urls(css: &str, base: &Url) -> String {
    let tokens = tokenize(css);
    let mut output = String::with_capacity(css.len());
    let mut cursor = 0;
    let mut i = 0;

    while i < tokens.len() {
        let span = tokens[i].span.clone();
        match &tokens[i].token {
            // url(foo.png)
            CssToken::Url(value) => {
                if let Some(absolute) = absolute_reference(value, base) {
                    output.push_str(&css[cursor..span.start]);
                    output.push_str(&format!("url({})", quote(&absolute)));
                    cursor = span.end;
                }
            }

            // url("foo.png")
            CssToken::Function(name) if name.eq_ignore_ascii_case("url") => {
                let argument = next_significant(&tokens, i + 1);
                let close = argument.and_then(|a| next_significant(&tokens, a + 1));
                if let (Some(argument), Some(close)) = (argument, close) {
                    if let (CssToken::String(value), CssToken::RightParen) =
                        (&tokens[argument].token, &tokens[close].token)
                    {
                        if let Some(absolute) = absolute_reference(value, base) {
                            output.push_str(&css[cursor..span.start]);
                            output.push_str(&format!("url({})", quote(&absolute)));
                            cursor = tokens[close].span.end;
                            i = close + 1;
                            continue;
                        }
                    }
                }
            }

            // @import "foo.css";
            CssToken::AtKeyword(name) if name.eq_ignore_ascii_case("import") => {
                if let Some(next) = next_significant(&tokens, i + 1) {
                    if let CssToken::String(value) = &tokens[next].token {
                        if let Some(absolute) = absolute_reference(value, base) {
                            let string_span = tokens[next].span.clone();
                            output.push_str(&css[cursor..string_span.start]);
                            output.push_str(&quote(&absolute));
                            cursor = string_span.end;
                            i = next + 1;
                            continue;
                        }
                    }
                }
            }

            _ => {}
        }
        i += 1;
    }

    output.push_str(&css[cursor..]);
    output
}

/// The absolute form of `reference`, or `None` if it should stay as written.
fn absolute_reference(reference: &str, base: &Url) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() || reference.starts_with('#') {
        return None;
    }
    if reference
        .get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
    {
        return None;
    }
    resolve_against(reference, base).map(String::from)
}

/// [CSSOM § 2.1 Serialize a string](https://www.w3.org/TR/cssom-1/#serialize-a-string)
fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' | '\\' => {
                quoted.push('\\');
                quoted.push(c);
            }
            '\n' => quoted.push_str("\\a "),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
