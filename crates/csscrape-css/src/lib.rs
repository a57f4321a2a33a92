//! CSS provenance model and the CSS Syntax pieces the scraper needs.
//!
//! # Scope
//!
//! This crate implements:
//! - **Origin Model** - [`CssOrigin`], where a fragment of CSS came from
//! - **CSS Lexer** ([§ 4 Tokenization](https://www.w3.org/TR/css-syntax-3/#tokenization))
//!   - Strings, urls, at-keywords, functions, blocks, with source spans
//!   - Comment and escape handling
//! - **Import Extraction** ([§ 2 Importing Style Sheets](https://www.w3.org/TR/css-cascade-4/#at-import))
//! - **URL Normalization** - rewrite `url(...)` references to absolute form
//!
//! # Not Yet Implemented
//!
//! - Rewriting bare strings inside `image-set()` and `@font-face` `src`
//! - `@import` media, `supports()` and `layer()` conditions (parsed over, not kept)

/// `@import` rule extraction.
pub mod imports;
/// Spanned CSS tokenizer per [§ 4 Tokenization](https://www.w3.org/TR/css-syntax-3/#tokenization).
pub mod lexer;
/// Where a fragment of CSS came from.
pub mod origin;
/// Rewriting embedded URLs to absolute form.
pub mod urls;

pub use imports::{ImportRule, extract_imports};
pub use lexer::{CssLexer, CssToken, SpannedToken};
pub use origin::{
    CssOrigin, FileOrigin, ImportOrigin, InlineOrigin, LinkOrigin, LinkResource, LocalFileOrigin,
    OriginKind, StyleOrigin,
};
pub use urls::absolutize_urls;
