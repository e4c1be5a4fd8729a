//! Diagnostic types for lint results

use crate::node::Node;
use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Rule source reported for documents that are not well-formed XML
pub const PARSE_ERROR_SOURCE: &str = "xml-parse";

/// Message reported for documents that are not well-formed XML
pub const PARSE_ERROR_MESSAGE: &str = "This file could not be parsed as XML.";

/// Words of element text quoted as context
const CONTEXT_WORDS: usize = 8;
/// Characters of element text quoted as context
const CONTEXT_CHARS: usize = 50;

/// Severity level of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Likely problem, worth a look
    Warning,
    /// Definite problem
    #[default]
    Error,
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "error" => Ok(Severity::Error),
            "warning" => Ok(Severity::Warning),
            _ => Err(s.to_string()),
        }
    }
}

impl Severity {
    /// Get display name
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }

    /// Get colored display name for terminal output
    pub fn colored(&self) -> ColoredString {
        match self {
            Severity::Error => self.as_str().red().bold(),
            Severity::Warning => self.as_str().yellow().bold(),
        }
    }
}

/// A rule violation found on a node of a parsed document
#[derive(Debug, Clone)]
pub struct Violation<'a> {
    /// File the node belongs to
    pub path: PathBuf,
    /// Rule file that produced the violation
    pub source: String,
    pub severity: Severity,
    /// Offending node, empty for whole-file failures
    pub node: Node<'a>,
    pub message: String,
}

impl<'a> Violation<'a> {
    /// Create a new violation
    pub fn new(
        path: &Path,
        source: impl Into<String>,
        severity: Severity,
        node: Node<'a>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            source: source.into(),
            severity,
            node,
            message: message.into(),
        }
    }

    /// The violation reported for a file that is not well-formed XML
    pub fn unparsable(path: &Path) -> Violation<'static> {
        Violation::new(
            path,
            PARSE_ERROR_SOURCE,
            Severity::Error,
            crate::node::EMPTY,
            PARSE_ERROR_MESSAGE,
        )
    }
}

/// Source location in a file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Location {
    /// File path
    pub file: PathBuf,
    /// Line number (1-based, 0 when unknown)
    pub line: usize,
    /// Column number (1-based, 0 when unknown)
    pub column: usize,
}

/// What the reader should look for to find the offending element
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum Context {
    /// The first words of the element's text or descriptive attribute
    Excerpt(String),
    /// The target of a link or image
    Reference(String),
}

/// A lint diagnostic, detached from the parsed document
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    /// Rule file that triggered this diagnostic
    pub source: String,
    pub severity: Severity,
    /// Message, possibly with `*bold*` and `` `code` `` markup
    pub message: String,
    pub location: Location,
    /// Name of the offending element
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
}

impl Diagnostic {
    /// Create a new diagnostic
    pub fn new(
        source: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        location: Location,
    ) -> Self {
        Self {
            source: source.into(),
            severity,
            message: message.into(),
            location,
            element: None,
            context: None,
        }
    }

    /// Add the offending element's name
    pub fn with_element(mut self, element: impl Into<String>) -> Self {
        self.element = Some(element.into());
        self
    }

    /// Add context describing the offending element
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }
}

impl From<Violation<'_>> for Diagnostic {
    fn from(violation: Violation<'_>) -> Self {
        let node = violation.node;
        let location = Location {
            file: violation.path,
            line: node.line(),
            column: node.column(),
        };
        let mut diagnostic = Diagnostic::new(
            violation.source,
            violation.severity,
            violation.message,
            location,
        );

        if node.exists() {
            diagnostic = diagnostic.with_element(node.name());
        }
        if let Some(context) = describe(node) {
            diagnostic = diagnostic.with_context(context);
        }
        diagnostic
    }
}

/// Describe a node so a reader can find it in the editor
pub fn describe(node: Node<'_>) -> Option<Context> {
    if node.is_empty() {
        return None;
    }

    let value = node.value_of();
    let excerpt = std::iter::once(value.as_str())
        .chain(["alt", "title", "Title", "Comment"].map(|name| node.attribute(name)))
        .map(str::trim)
        .find(|text| !text.is_empty());
    if let Some(text) = excerpt {
        return Some(Context::Excerpt(first_words(text)));
    }

    ["href", "src", "Link"]
        .map(|name| node.attribute(name).trim())
        .into_iter()
        .find(|text| !text.is_empty())
        .map(|text| Context::Reference(text.to_string()))
}

fn first_words(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().take(CONTEXT_WORDS).collect();
    words.join(" ").chars().take(CONTEXT_CHARS).collect()
}
