//! [CSS Cascading Level 4 § 2](https://www.w3.org/TR/css-cascade-4/#at-import)
//!
//! "The @import rule allows users to import style rules from other style
//! sheets."
//!
//! ```text
//! @import [ <url> | <string> ]
//!         [ layer | layer(<layer-name>) ]?
//!         [ supports( ... ) ]?
//!         <media-query-list>? ;
//! ```

use core::ops::Range;

use crate::lexer::{CssToken, SpannedToken, tokenize};

/// One `@import` rule found in a stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRule {
    /// The reference as written, unquoted and unescaped. Not yet resolved.
    pub href: String,
    /// Byte range of the whole rule, `@import` through `;` (or EOF).
    pub span: Range<usize>,
}

/// Find every top-level `@import` rule in `css`, in source order.
///
/// Rules whose first component is not a string, a `url(...)` token, or a
/// `url("...")` function are ignored, as are `@import`s nested inside
/// blocks. Position relative to other rules is not checked: an `@import`
/// after a style rule is still reported.
#[must_use]
pub fn extract_imports(css: &str) -> Vec<ImportRule> {
    let tokens = tokenize(css);
    let mut imports = Vec::new();
    let mut depth = 0usize;
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i].token {
            CssToken::LeftBrace
            | CssToken::LeftParen
            | CssToken::LeftBracket
            | CssToken::Function(_) => depth += 1,
            CssToken::RightBrace | CssToken::RightParen | CssToken::RightBracket => {
                depth = depth.saturating_sub(1);
            }
            CssToken::AtKeyword(name) if depth == 0 && name.eq_ignore_ascii_case("import") => {
                let end = rule_end(&tokens, i);
                if let Some(href) = import_href(&tokens, i + 1) {
                    imports.push(ImportRule {
                        href,
                        span: tokens[i].span.start..tokens[end - 1].span.end,
                    });
                }
                // The prelude holds no nested imports; skip straight past it.
                i = end;
                continue;
            }
            _ => {}
        }
        i += 1;
    }

    imports
}

/// Index just past the `;` that ends the at-rule starting at `start`, or
/// the token count when the rule runs to EOF or into a block.
fn rule_end(tokens: &[SpannedToken], start: usize) -> usize {
    let mut depth = 0usize;
    for (offset, token) in tokens[start..].iter().enumerate() {
        match token.token {
            CssToken::LeftParen | CssToken::LeftBracket | CssToken::Function(_) => depth += 1,
            CssToken::RightParen | CssToken::RightBracket => depth = depth.saturating_sub(1),
            CssToken::Semicolon if depth == 0 => return start + offset + 1,
            // "@import" with a block is invalid; stop before the block so its
            // contents are scanned normally.
            CssToken::LeftBrace if depth == 0 => return start + offset,
            _ => {}
        }
    }
    tokens.len()
}

/// The reference of an `@import` whose prelude starts at `start`.
fn import_href(tokens: &[SpannedToken], start: usize) -> Option<String> {
    let first = next_significant(tokens, start)?;
    match &tokens[first].token {
        CssToken::String(href) | CssToken::Url(href) => Some(href.clone()),
        CssToken::Function(name) if name.eq_ignore_ascii_case("url") => {
            let argument = next_significant(tokens, first + 1)?;
            match &tokens[argument].token {
                CssToken::String(href) => Some(href.clone()),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Index of the first non-whitespace token at or after `from`.
pub(crate) fn next_significant(tokens: &[SpannedToken], from: usize) -> Option<usize> {
    (from..tokens.len()).find(|&i| tokens[i].token != CssToken::Whitespace)
}
