//! Inline markup in rule messages
//!
//! Messages may use `*bold*` and `` `code` ``. A backslash before `*`,
//! `` ` `` or `\` makes that character literal.

use std::fmt::Write;

/// A run of message text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Text(String),
    Bold(String),
    Code(String),
}

impl Span {
    pub fn text(&self) -> &str {
        match self {
            Span::Text(text) | Span::Bold(text) | Span::Code(text) => text,
        }
    }
}

/// Split a message into plain, bold and code spans
pub fn parse(message: &str) -> Vec<Span> {
    // Unescaped characters, flagged when they may open or close a span
    let chars: Vec<(char, bool)> = {
        let mut chars = Vec::with_capacity(message.len());
        let mut iter = message.chars().peekable();
        while let Some(c) = iter.next() {
            match (c, iter.peek()) {
                ('\\', Some(&next)) if matches!(next, '*' | '`' | '\\') => {
                    chars.push((next, false));
                    iter.next();
                }
                ('*' | '`', _) => chars.push((c, true)),
                _ => chars.push((c, false)),
            }
        }
        chars
    };

    let mut spans = Vec::new();
    let mut text = String::new();
    let mut i = 0;
    while i < chars.len() {
        let (c, delimiter) = chars[i];
        let close = delimiter
            .then(|| chars[i + 1..].iter().position(|&d| d == (c, true)))
            .flatten()
            .filter(|&len| len > 0);

        match close {
            Some(len) => {
                if !text.is_empty() {
                    spans.push(Span::Text(std::mem::take(&mut text)));
                }
                let inner: String = chars[i + 1..i + 1 + len].iter().map(|(c, _)| c).collect();
                spans.push(if c == '*' { Span::Bold(inner) } else { Span::Code(inner) });
                i += len + 2;
            }
            None => {
                text.push(c);
                i += 1;
            }
        }
    }
    if !text.is_empty() {
        spans.push(Span::Text(text));
    }
    spans
}

/// Message text without markup
pub fn plain(spans: &[Span]) -> String {
    spans.iter().map(Span::text).collect()
}

/// Message text with span delimiters and without escapes
pub fn to_source(spans: &[Span]) -> String {
    let mut source = String::new();
    for span in spans {
        let _ = match span {
            Span::Text(text) => write!(source, "{text}"),
            Span::Bold(text) => write!(source, "*{text}*"),
            Span::Code(text) => write!(source, "`{text}`"),
        };
    }
    source
}
