//! Escaping-aware delimiter scanner
//!
//! The scanner walks text once, looking for an open/close delimiter pair
//! (for example `#{` and `}`), and hands each enclosed expression to a
//! handler whose return value replaces the whole delimited span. A
//! backslash escapes either delimiter; an open token with no matching
//! close token degrades to literal text rather than an error.

use crate::error::Result;

/// Receives each complete delimited expression and supplies its replacement.
pub trait TokenHandler {
    fn handle_token(&mut self, expression: &str) -> Result<String>;
}

impl<F> TokenHandler for F
where
    F: FnMut(&str) -> Result<String>,
{
    fn handle_token(&mut self, expression: &str) -> Result<String> {
        self(expression)
    }
}

/// Single-pass scanner for one delimiter pair. Delimiters may be
/// multi-character; matching is byte-exact.
pub struct TokenScanner {
    open_token: String,
    close_token: String,
}

impl TokenScanner {
    pub fn new(open_token: impl Into<String>, close_token: impl Into<String>) -> Self {
        Self {
            open_token: open_token.into(),
            close_token: close_token.into(),
        }
    }

    /// Scan `text` left to right, replacing each complete token pair with
    /// the handler's output. Empty input yields an empty string without
    /// invoking the handler.
    pub fn scan(&self, text: &str, handler: &mut dyn TokenHandler) -> Result<String> {
        if text.is_empty() {
            return Ok(String::new());
        }
        let mut start = match text.find(&self.open_token) {
            Some(i) => i,
            None => return Ok(text.to_string()),
        };
        let bytes = text.as_bytes();
        let mut builder = String::with_capacity(text.len());
        let mut expression = String::new();
        let mut offset = 0;
        loop {
            if start > 0 && bytes[start - 1] == b'\\' {
                // Escaped open token: drop the backslash, keep the token.
                builder.push_str(&text[offset..start - 1]);
                builder.push_str(&self.open_token);
                offset = start + self.open_token.len();
            } else {
                expression.clear();
                builder.push_str(&text[offset..start]);
                offset = start + self.open_token.len();
                let mut end = text[offset..].find(&self.close_token).map(|i| i + offset);
                while let Some(e) = end {
                    if e > offset && bytes[e - 1] == b'\\' {
                        // Escaped close token inside the expression.
                        expression.push_str(&text[offset..e - 1]);
                        expression.push_str(&self.close_token);
                        offset = e + self.close_token.len();
                        end = text[offset..].find(&self.close_token).map(|i| i + offset);
                    } else {
                        expression.push_str(&text[offset..e]);
                        break;
                    }
                }
                match end {
                    None => {
                        // Close token never found: emit the rest verbatim.
                        builder.push_str(&text[start..]);
                        offset = text.len();
                    }
                    Some(e) => {
                        builder.push_str(&handler.handle_token(&expression)?);
                        offset = e + self.close_token.len();
                    }
                }
            }
            start = match text[offset..].find(&self.open_token) {
                Some(i) => i + offset,
                None => break,
            };
        }
        if offset < text.len() {
            builder.push_str(&text[offset..]);
        }
        Ok(builder)
    }
}
