//! [§ 4 Tokenization](https://www.w3.org/TR/css-syntax-3/#tokenization)
//!
//! A CSS tokenizer that keeps the byte span of every token in the source, so
//! callers can rewrite parts of a stylesheet in place. Numeric tokens are
//! recognised only far enough to not be mistaken for anything else; their
//! values are not kept.

use core::ops::Range;

/// [§ 4.2 Definitions](https://www.w3.org/TR/css-syntax-3/#token-diagrams)
///
/// The token kinds the scraper distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CssToken {
    /// "`<whitespace-token>`"
    Whitespace,
    /// "`<at-keyword-token>`", value without the leading `@`.
    AtKeyword(String),
    /// "`<ident-token>`"
    Ident(String),
    /// "`<function-token>`", value without the trailing `(`.
    Function(String),
    /// "`<hash-token>`", value without the leading `#`.
    Hash(String),
    /// "`<string-token>`", value unquoted and unescaped.
    String(String),
    /// "`<bad-string-token>`"
    BadString,
    /// "`<url-token>`", value unescaped.
    Url(String),
    /// "`<bad-url-token>`"
    BadUrl,
    /// "`<number-token>`", "`<percentage-token>`" or "`<dimension-token>`".
    Numeric,
    /// "`<colon-token>`"
    Colon,
    /// "`<semicolon-token>`"
    Semicolon,
    /// "`<comma-token>`"
    Comma,
    /// "`<{-token>`"
    LeftBrace,
    /// "`<}-token>`"
    RightBrace,
    /// "`<(-token>`"
    LeftParen,
    /// "`<)-token>`"
    RightParen,
    /// "`<[-token>`"
    LeftBracket,
    /// "`<]-token>`"
    RightBracket,
    /// "`<CDO-token>`" (`<!--`)
    Cdo,
    /// "`<CDC-token>`" (`-->`)
    Cdc,
    /// "`<delim-token>`"
    Delim(char),
}

/// A token and the byte range of the source text it was consumed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpannedToken {
    /// The token.
    pub token: CssToken,
    /// Byte offsets into the source, end exclusive.
    pub span: Range<usize>,
}

/// [§ 4.3 Tokenizer Algorithms](https://www.w3.org/TR/css-syntax-3/#tokenizer-algorithms)
pub struct CssLexer<'a> {
    /// The input being tokenized.
    input: &'a str,
    /// Byte offset of the next input code point.
    position: usize,
    /// Collected tokens.
    tokens: Vec<SpannedToken>,
}

impl<'a> CssLexer<'a> {
    /// Create a lexer over `input`.
    #[must_use]
    pub const fn new(input: &'a str) -> Self {
        Self {
            input,
            position: 0,
            tokens: Vec::new(),
        }
    }

    /// Tokenize the whole input.
    pub fn run(&mut self) {
        while let Some(token) = self.consume_token() {
            self.tokens.push(token);
        }
    }

    /// Return the collected tokens.
    #[must_use]
    pub fn into_tokens(self) -> Vec<SpannedToken> {
        self.tokens
    }

    /// Return a reference to the collected tokens.
    #[must_use]
    pub fn tokens(&self) -> &[SpannedToken] {
        &self.tokens
    }

    /// [§ 4.3.1 Consume a token](https://www.w3.org/TR/css-syntax-3/#consume-token)
    ///
    /// Returns `None` at EOF.
    fn consume_token(&mut self) -> Option<SpannedToken> {
        // "Consume comments."
        self.consume_comments();

        let start = self.position;
        let (first, second, third) = self.lookahead();
        let first = first?;

        let token = match first {
            // "whitespace"
            // "Consume as much whitespace as possible. Return a <whitespace-token>."
            c if is_whitespace(c) => {
                self.consume_whitespace();
                CssToken::Whitespace
            }

            // "U+0022 QUOTATION MARK (")" / "U+0027 APOSTROPHE (')"
            // "Consume a string token and return it."
            '"' | '\'' => {
                let _ = self.consume();
                self.consume_string_token(first)
            }

            // "U+0023 NUMBER SIGN (#)"
            '#' => {
                let _ = self.consume();
                if second.is_some_and(is_ident_code_point) || is_valid_escape(second, third) {
                    CssToken::Hash(self.consume_ident_sequence())
                } else {
                    CssToken::Delim('#')
                }
            }

            '(' => self.simple(CssToken::LeftParen),
            ')' => self.simple(CssToken::RightParen),
            '[' => self.simple(CssToken::LeftBracket),
            ']' => self.simple(CssToken::RightBracket),
            '{' => self.simple(CssToken::LeftBrace),
            '}' => self.simple(CssToken::RightBrace),
            ',' => self.simple(CssToken::Comma),
            ':' => self.simple(CssToken::Colon),
            ';' => self.simple(CssToken::Semicolon),

            // "U+002B PLUS SIGN (+)" / "U+002E FULL STOP (.)"
            // "If the input stream starts with a number, reconsume the current
            // input code point, consume a numeric token, and return it."
            '+' | '.' if would_start_number(Some(first), second, third) => {
                self.consume_numeric_token()
            }

            // "U+002D HYPHEN-MINUS (-)"
            '-' => {
                if would_start_number(Some(first), second, third) {
                    self.consume_numeric_token()
                } else if second == Some('-') && third == Some('>') {
                    // "Otherwise, if the next 2 input code points are U+002D
                    // HYPHEN-MINUS U+003E GREATER-THAN SIGN (->), consume them
                    // and return a <CDC-token>."
                    self.advance(3);
                    CssToken::Cdc
                } else if would_start_ident_sequence(Some(first), second, third) {
                    self.consume_ident_like_token()
                } else {
                    self.simple(CssToken::Delim('-'))
                }
            }

            // "U+003C LESS-THAN SIGN (<)"
            // "If the next 3 input code points are U+0021 EXCLAMATION MARK
            // U+002D HYPHEN-MINUS U+002D HYPHEN-MINUS (!--), consume them and
            // return a <CDO-token>."
            '<' if self.input[self.position..].starts_with("<!--") => {
                self.advance(4);
                CssToken::Cdo
            }

            // "U+0040 COMMERCIAL AT (@)"
            '@' => {
                let _ = self.consume();
                let (a, b, c) = self.lookahead();
                if would_start_ident_sequence(a, b, c) {
                    CssToken::AtKeyword(self.consume_ident_sequence())
                } else {
                    CssToken::Delim('@')
                }
            }

            // "U+005C REVERSE SOLIDUS (\)"
            '\\' if is_valid_escape(Some(first), second) => self.consume_ident_like_token(),

            c if c.is_ascii_digit() => self.consume_numeric_token(),

            c if is_ident_start_code_point(c) => self.consume_ident_like_token(),

            // "anything else"
            // "Return a <delim-token> with its value set to the current input code point."
            other => self.simple(CssToken::Delim(other)),
        };

        Some(SpannedToken {
            token,
            span: start..self.position,
        })
    }

    /// Consume one code point and return `token`.
    fn simple(&mut self, token: CssToken) -> CssToken {
        let _ = self.consume();
        token
    }

    /// [§ 4.3.2 Consume comments](https://www.w3.org/TR/css-syntax-3/#consume-comment)
    ///
    /// "If the next two input code points are U+002F SOLIDUS (/) followed by
    /// U+002A ASTERISK (*), consume them and all following code points up to
    /// and including the first U+002A ASTERISK (*) followed by U+002F SOLIDUS (/),
    /// or up to an EOF code point."
    fn consume_comments(&mut self) {
        while self.input[self.position..].starts_with("/*") {
            match self.input[self.position + 2..].find("*/") {
                Some(end) => self.position += 2 + end + 2,
                None => self.position = self.input.len(),
            }
        }
    }

    /// Consume whitespace characters.
    fn consume_whitespace(&mut self) {
        while self.peek().is_some_and(is_whitespace) {
            let _ = self.consume();
        }
    }

    /// [§ 4.3.4 Consume a string token](https://www.w3.org/TR/css-syntax-3/#consume-string-token)
    fn consume_string_token(&mut self, ending_code_point: char) -> CssToken {
        // "Initially create a <string-token> with its value set to the empty string."
        let mut value = String::new();

        loop {
            match self.consume() {
                // "ending code point" / "EOF"
                // "Return the <string-token>."
                Some(c) if c == ending_code_point => return CssToken::String(value),
                None => return CssToken::String(value),

                // "newline"
                // "This is a parse error. Reconsume the current input code point,
                // create a <bad-string-token>, and return it."
                Some(c) if is_newline(c) => {
                    self.reconsume();
                    return CssToken::BadString;
                }

                // "U+005C REVERSE SOLIDUS (\)"
                Some('\\') => match self.peek() {
                    // "If the next input code point is EOF, do nothing."
                    None => {}
                    // "Otherwise, if the next input code point is a newline,
                    // consume it."
                    Some(c) if is_newline(c) => self.consume_newline(),
                    // "Otherwise, (the stream starts with a valid escape)
                    // consume an escaped code point and append the returned
                    // code point to the <string-token>'s value."
                    Some(_) => value.push(self.consume_escaped_code_point()),
                },

                // "anything else"
                Some(c) => value.push(c),
            }
        }
    }

    /// [§ 4.3.3 Consume a numeric token](https://www.w3.org/TR/css-syntax-3/#consume-numeric-token)
    fn consume_numeric_token(&mut self) -> CssToken {
        self.consume_number();

        let (a, b, c) = self.lookahead();
        if would_start_ident_sequence(a, b, c) {
            // "<dimension-token>": the unit is an ident sequence.
            let _ = self.consume_ident_sequence();
        } else if a == Some('%') {
            // "<percentage-token>"
            let _ = self.consume();
        }
        CssToken::Numeric
    }

    /// [§ 4.3.12 Consume a number](https://www.w3.org/TR/css-syntax-3/#consume-number)
    fn consume_number(&mut self) {
        if matches!(self.peek(), Some('+' | '-')) {
            let _ = self.consume();
        }
        self.consume_digits();

        // "If the next 2 input code points are U+002E FULL STOP (.) followed by a digit..."
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            let _ = self.consume();
            self.consume_digits();
        }

        // "If the next 2 or 3 input code points are U+0045 LATIN CAPITAL LETTER E (E)
        // or U+0065 LATIN SMALL LETTER E (e), optionally followed by U+002D HYPHEN-MINUS (-)
        // or U+002B PLUS SIGN (+), followed by a digit..."
        if matches!(self.peek(), Some('e' | 'E')) {
            let signed = matches!(self.peek_at(1), Some('+' | '-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                self.advance(digit_at);
                self.consume_digits();
            }
        }
    }

    fn consume_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            let _ = self.consume();
        }
    }

    /// [§ 4.3.4 Consume an ident-like token](https://www.w3.org/TR/css-syntax-3/#consume-ident-like-token)
    fn consume_ident_like_token(&mut self) -> CssToken {
        // "Consume an ident sequence, and let string be the result."
        let string = self.consume_ident_sequence();

        // "If string's value is an ASCII case-insensitive match for 'url',
        // and the next input code point is U+0028 LEFT PARENTHESIS (()"
        if string.eq_ignore_ascii_case("url") && self.peek() == Some('(') {
            let _ = self.consume();

            // "While the next two input code points are whitespace, consume
            // the next input code point."
            while self.peek().is_some_and(is_whitespace) && self.peek_at(1).is_some_and(is_whitespace)
            {
                let _ = self.consume();
            }

            // "If the next one or two input code points are U+0022 QUOTATION
            // MARK ("), U+0027 APOSTROPHE ('), or whitespace followed by
            // U+0022 QUOTATION MARK (") or U+0027 APOSTROPHE ('), then create
            // a <function-token> with its value set to string and return it."
            let quoted = match (self.peek(), self.peek_at(1)) {
                (Some('"' | '\''), _) => true,
                (Some(c), Some('"' | '\'')) => is_whitespace(c),
                _ => false,
            };
            if quoted {
                CssToken::Function(string)
            } else {
                // "Otherwise, consume a url token, and return it."
                self.consume_url_token()
            }
        }
        // "Otherwise, if the next input code point is U+0028 LEFT PARENTHESIS (()"
        else if self.peek() == Some('(') {
            let _ = self.consume();
            CssToken::Function(string)
        }
        // "Otherwise, create an <ident-token> with its value set to string."
        else {
            CssToken::Ident(string)
        }
    }

    /// [§ 4.3.6 Consume a url token](https://www.w3.org/TR/css-syntax-3/#consume-url-token)
    fn consume_url_token(&mut self) -> CssToken {
        // "Initially create a <url-token> with its value set to the empty string."
        let mut value = String::new();

        // "Consume as much whitespace as possible."
        self.consume_whitespace();

        loop {
            match self.consume() {
                // "U+0029 RIGHT PARENTHESIS ())" / "EOF"
                // "Return the <url-token>."
                Some(')') | None => return CssToken::Url(value),

                // "whitespace"
                // "Consume as much whitespace as possible. If the next input code
                // point is U+0029 RIGHT PARENTHESIS ()) or EOF, consume it and
                // return the <url-token>; otherwise, consume the remnants of a
                // bad url, create a <bad-url-token>, and return it."
                Some(c) if is_whitespace(c) => {
                    self.consume_whitespace();
                    return match self.peek() {
                        Some(')') => {
                            let _ = self.consume();
                            CssToken::Url(value)
                        }
                        None => CssToken::Url(value),
                        Some(_) => {
                            self.consume_bad_url_remnants();
                            CssToken::BadUrl
                        }
                    };
                }

                // "U+0022 QUOTATION MARK ("), U+0027 APOSTROPHE ('), U+0028 LEFT
                // PARENTHESIS ((), non-printable code point"
                // "This is a parse error. Consume the remnants of a bad url,
                // create a <bad-url-token>, and return it."
                Some(c) if matches!(c, '"' | '\'' | '(') || is_non_printable(c) => {
                    self.consume_bad_url_remnants();
                    return CssToken::BadUrl;
                }

                // "U+005C REVERSE SOLIDUS (\)"
                Some('\\') => {
                    if is_valid_escape(Some('\\'), self.peek()) {
                        value.push(self.consume_escaped_code_point());
                    } else {
                        self.consume_bad_url_remnants();
                        return CssToken::BadUrl;
                    }
                }

                // "anything else"
                Some(c) => value.push(c),
            }
        }
    }

    /// [§ 4.3.14 Consume the remnants of a bad url](https://www.w3.org/TR/css-syntax-3/#consume-remnants-of-bad-url)
    fn consume_bad_url_remnants(&mut self) {
        loop {
            match self.consume() {
                Some(')') | None => return,
                Some('\\') if is_valid_escape(Some('\\'), self.peek()) => {
                    let _ = self.consume_escaped_code_point();
                }
                Some(_) => {}
            }
        }
    }

    /// [§ 4.3.11 Consume an ident sequence](https://www.w3.org/TR/css-syntax-3/#consume-name)
    fn consume_ident_sequence(&mut self) -> String {
        let mut result = String::new();

        loop {
            match self.peek() {
                // "ident code point"
                Some(c) if is_ident_code_point(c) => {
                    let _ = self.consume();
                    result.push(c);
                }
                // "the stream starts with a valid escape"
                Some('\\') if is_valid_escape(Some('\\'), self.peek_at(1)) => {
                    let _ = self.consume();
                    result.push(self.consume_escaped_code_point());
                }
                // "anything else"
                _ => return result,
            }
        }
    }

    /// [§ 4.3.7 Consume an escaped code point](https://www.w3.org/TR/css-syntax-3/#consume-escaped-code-point)
    ///
    /// Assumes the U+005C REVERSE SOLIDUS (\) has already been consumed.
    fn consume_escaped_code_point(&mut self) -> char {
        match self.consume() {
            // "hex digit"
            // "Consume as many hex digits as possible, but no more than 5.
            // If the next input code point is whitespace, consume it as well."
            Some(c) if c.is_ascii_hexdigit() => {
                let mut hex = String::from(c);
                while hex.len() < 6 && self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                    if let Some(c) = self.consume() {
                        hex.push(c);
                    }
                }
                if self.peek().is_some_and(is_whitespace) {
                    let _ = self.consume();
                }

                // "If this number is zero, or is for a surrogate, or is greater
                // than the maximum allowed code point, return U+FFFD."
                u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|&n| n != 0)
                    .and_then(char::from_u32)
                    .unwrap_or(char::REPLACEMENT_CHARACTER)
            }
            // "EOF"
            // "This is a parse error. Return U+FFFD REPLACEMENT CHARACTER."
            None => char::REPLACEMENT_CHARACTER,
            // "anything else"
            Some(c) => c,
        }
    }

    /// Consume a newline, treating CRLF as one.
    fn consume_newline(&mut self) {
        if self.consume() == Some('\r') && self.peek() == Some('\n') {
            let _ = self.consume();
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.input[self.position..].chars().nth(n)
    }

    /// The next three input code points.
    fn lookahead(&self) -> (Option<char>, Option<char>, Option<char>) {
        let mut chars = self.input[self.position..].chars();
        (chars.next(), chars.next(), chars.next())
    }

    fn consume(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += c.len_utf8();
        Some(c)
    }

    fn advance(&mut self, count: usize) {
        for _ in 0..count {
            let _ = self.consume();
        }
    }

    fn reconsume(&mut self) {
        if let Some(c) = self.input[..self.position].chars().next_back() {
            self.position -= c.len_utf8();
        }
    }
}

/// Tokenize `input` in one call.
#[must_use]
pub fn tokenize(input: &str) -> Vec<SpannedToken> {
    let mut lexer = CssLexer::new(input);
    lexer.run();
    lexer.into_tokens()
}

/// [§ 4.2 Definitions](https://www.w3.org/TR/css-syntax-3/#whitespace)
///
/// "A newline, U+0009 CHARACTER TABULATION, or U+0020 SPACE."
const fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t') || is_newline(c)
}

/// [§ 3.3 Preprocessing the input stream](https://www.w3.org/TR/css-syntax-3/#input-preprocessing)
///
/// CR, FF and CRLF are all newlines once the stream is preprocessed.
const fn is_newline(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\x0C')
}

/// [§ 4.2 Definitions](https://www.w3.org/TR/css-syntax-3/#ident-start-code-point)
const fn is_ident_start_code_point(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || !c.is_ascii()
}

/// [§ 4.2 Definitions](https://www.w3.org/TR/css-syntax-3/#ident-code-point)
const fn is_ident_code_point(c: char) -> bool {
    is_ident_start_code_point(c) || c.is_ascii_digit() || c == '-'
}

/// [§ 4.2 Definitions](https://www.w3.org/TR/css-syntax-3/#non-printable-code-point)
const fn is_non_printable(c: char) -> bool {
    matches!(c, '\0'..='\x08' | '\x0B' | '\x0E'..='\x1F' | '\x7F')
}

/// [§ 4.3.8 Check if two code points are a valid escape](https://www.w3.org/TR/css-syntax-3/#starts-with-a-valid-escape)
fn is_valid_escape(first: Option<char>, second: Option<char>) -> bool {
    first == Some('\\') && second.is_some_and(|c| !is_newline(c))
}

/// [§ 4.3.9 Check if three code points would start an ident sequence](https://www.w3.org/TR/css-syntax-3/#would-start-an-identifier)
fn would_start_ident_sequence(first: Option<char>, second: Option<char>, third: Option<char>) -> bool {
    match first {
        Some('-') => {
            second.is_some_and(|c| is_ident_start_code_point(c) || c == '-')
                || is_valid_escape(second, third)
        }
        Some('\\') => is_valid_escape(first, second),
        Some(c) => is_ident_start_code_point(c),
        None => false,
    }
}

/// [§ 4.3.10 Check if three code points would start a number](https://www.w3.org/TR/css-syntax-3/#starts-with-a-number)
fn would_start_number(first: Option<char>, second: Option<char>, third: Option<char>) -> bool {
    let is_digit = |c: Option<char>| c.is_some_and(|c| c.is_ascii_digit());
    match first {
        Some('+' | '-') => is_digit(second) || (second == Some('.') && is_digit(third)),
        Some('.') => is_digit(second),
        c => is_digit(c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<CssToken> {
        tokenize(input)
            .into_iter()
            .map(|t| t.token)
            .filter(|t| *t != CssToken::Whitespace)
            .collect()
    }

    #[test]
    fn test_spans_cover_source_text() {
        let css = "@import url(a.css);";
        let tokens = tokenize(css);
        let texts: Vec<&str> = tokens.iter().map(|t| &css[t.span.clone()]).collect();
        assert_eq!(texts, ["@import", " ", "url(a.css)", ";"]);
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("/* @import 'x.css'; */ a /* unterminated"),
            [CssToken::Ident("a".to_string())]
        );
    }

    #[test]
    fn test_numbers_do_not_become_idents() {
        assert_eq!(
            kinds("10px 1e3 -.5em 50%"),
            [CssToken::Numeric, CssToken::Numeric, CssToken::Numeric, CssToken::Numeric]
        );
    }

    #[test]
    fn test_escaped_code_points() {
        assert_eq!(
            kinds(r#""a\"b" "\31 x" "\0""#),
            [
                CssToken::String("a\"b".to_string()),
                CssToken::String("1x".to_string()),
                CssToken::String("\u{FFFD}".to_string()),
            ]
        );
    }

    #[test]
    fn test_multibyte_spans() {
        let css = "é{content:\"→\"}";
        let tokens = tokenize(css);
        assert_eq!(tokens[0].token, CssToken::Ident("é".to_string()));
        assert_eq!(&css[tokens[0].span.clone()], "é");
        assert_eq!(&css[tokens[4].span.clone()], "\"→\"");
    }
}
