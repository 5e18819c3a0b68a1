//! Sanitize-and-autolink for free-text annotations.
//!
//! Text is HTML-escaped first; URL matches in the escaped text are then wrapped
//! in anchors that open in a new browsing context. The anchor markup is added
//! after escaping and is never escaped itself.

use regex::Regex;
use std::borrow::Cow;

pub const DEFAULT_URL_PATTERN: &str = r"(https?|ftp)://[a-zA-Z0-9_@\-]+([.:][a-zA-Z0-9_@-]+)*/?[a-zA-Z0-9_?,%#~&/\-+=]+([:.][a-zA-Z0-9_?,%#~&/\-+=]+)*";

const LINK_TEMPLATE: &str = "<a href='${0}' target='_blank'>${0}</a>";

#[derive(Debug, Clone)]
pub struct Autolinker {
    url: Regex,
}

impl Autolinker {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            url: Regex::new(pattern)?,
        })
    }

    pub fn render(&self, text: &str) -> String {
        let escaped = escape_html(text);
        self.url.replace_all(&escaped, LINK_TEMPLATE).into_owned()
    }
}

impl Default for Autolinker {
    fn default() -> Self {
        Self {
            url: Regex::new(DEFAULT_URL_PATTERN).expect("valid default URL regex"),
        }
    }
}

/// Escapes the characters significant in HTML text and attribute values.
pub fn escape_html(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '\'', '<', '>', '"', '\0']) {
        return Cow::Borrowed(text);
    }

    let mut escaped = String::with_capacity(text.len() + 16);
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '\'' => escaped.push_str("&#39;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\0' => escaped.push('\u{FFFD}'),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}
