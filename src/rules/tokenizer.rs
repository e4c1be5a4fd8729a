//! Tokenizer for rule files
//!
//! Rule files are scanned one line at a time. Each line is split into
//! tokens by a fixed precedence table; section headers are only
//! recognized at the start of a line.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::VecDeque;
use std::fmt;
use std::str::SplitInclusive;

/// Value of the token produced at end of input
pub const END_OF_FILE: &str = "end of file";

static TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?P<section>^[A-Za-z]+:)",
        r"|(?P<wildcard>\*)",
        r"|(?P<name>[.A-Za-z][-_.:A-Za-z0-9]*)",
        r"|(?P<number>[0-9]+)",
        r#"|(?P<quote>".*?")"#,
        r"|(?P<newline>\n)",
        r"|(?P<whitespace>[ \t]+)",
        r"|(?P<other>.)",
    ))
    .unwrap()
});

/// Token classes, in precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Section,
    Wildcard,
    Name,
    Number,
    Quote,
    Newline,
    Whitespace,
    Other,
    End,
}

impl TokenKind {
    const GROUPS: [(&'static str, TokenKind); 8] = [
        ("section", TokenKind::Section),
        ("wildcard", TokenKind::Wildcard),
        ("name", TokenKind::Name),
        ("number", TokenKind::Number),
        ("quote", TokenKind::Quote),
        ("newline", TokenKind::Newline),
        ("whitespace", TokenKind::Whitespace),
        ("other", TokenKind::Other),
    ];
}

/// A lexical token of a rule file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    /// 1-based line
    pub line: usize,
    /// 1-based column, in characters
    pub column: usize,
}

impl Token {
    /// Whether this is the given section header, e.g. `when:`
    pub fn is_section(&self, header: &str) -> bool {
        self.kind == TokenKind::Section && self.value == header
    }

    /// Whether this token is skipped between arguments
    pub fn is_blank(&self) -> bool {
        matches!(self.kind, TokenKind::Whitespace | TokenKind::Newline)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::End => f.write_str(END_OF_FILE),
            TokenKind::Newline => f.write_str("end of line"),
            _ => write!(f, "'{}'", self.value),
        }
    }
}

/// Pull-based token stream over rule file text
pub struct Tokenizer<'a> {
    lines: SplitInclusive<'a, char>,
    line: usize,
    pending: VecDeque<Token>,
    current: Token,
    finished: bool,
}

impl<'a> Tokenizer<'a> {
    /// Start tokenizing; the first token is immediately current
    pub fn new(source: &'a str) -> Self {
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        let mut tokenizer = Self {
            lines: source.split_inclusive('\n'),
            line: 0,
            pending: VecDeque::new(),
            current: Token {
                kind: TokenKind::End,
                value: END_OF_FILE.to_string(),
                line: 1,
                column: 1,
            },
            finished: false,
        };
        tokenizer.advance();
        tokenizer
    }

    /// The current token
    pub fn current(&self) -> &Token {
        &self.current
    }

    /// Move to the next token; stays on the end token once reached
    pub fn advance(&mut self) {
        while self.pending.is_empty() {
            match self.lines.next() {
                Some(line) => {
                    self.line += 1;
                    self.scan_line(line);
                }
                None => {
                    self.current = Token {
                        kind: TokenKind::End,
                        value: END_OF_FILE.to_string(),
                        line: self.line.max(1),
                        column: 1,
                    };
                    return;
                }
            }
        }
        if let Some(token) = self.pending.pop_front() {
            self.current = token;
        }
    }

    /// Skip whitespace and newlines
    pub fn skip_blank(&mut self) {
        while self.current.is_blank() {
            self.advance();
        }
    }

    fn scan_line(&mut self, line: &str) {
        let normalized;
        let line = match line.strip_suffix("\r\n") {
            Some(stripped) => {
                normalized = format!("{stripped}\n");
                normalized.as_str()
            }
            None => line,
        };

        for captures in TOKEN_REGEX.captures_iter(line) {
            let Some((kind, m)) = TokenKind::GROUPS
                .iter()
                .find_map(|(group, kind)| captures.name(group).map(|m| (*kind, m)))
            else {
                continue;
            };
            self.pending.push_back(Token {
                kind,
                value: m.as_str().to_string(),
                line: self.line,
                column: line[..m.start()].chars().count() + 1,
            });
        }
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    /// Yield every token, ending with the end token
    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        let token = self.current.clone();
        if token.kind == TokenKind::End {
            self.finished = true;
        } else {
            self.advance();
        }
        Some(token)
    }
}

/// Remove the quotes around a quoted token and resolve `\\` and `\n`
pub fn unquote(token: &str) -> String {
    let inner = token
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(token);

    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some('\\') => {
                    result.push('\\');
                    chars.next();
                }
                Some('n') => {
                    result.push('\n');
                    chars.next();
                }
                _ => result.push(c),
            }
        } else {
            result.push(c);
        }
    }
    result
}

/// Inverse of [`unquote`]
pub fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('\n', "\\n"))
}
