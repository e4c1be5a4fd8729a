//! flare-lint: A rule-driven linter for MadCap Flare projects
//!
//! Rules are plain-text files compiled into predicates over a small
//! XPath-like query engine. The engine applies them to every element of
//! the topics, snippets, TOCs and targets of a Flare project.

pub mod config;
pub mod diagnostics;
pub mod document;
pub mod engine;
pub mod loader;
pub mod markup;
pub mod node;
pub mod output;
pub mod project;
pub mod rules;

pub use config::{CliOptions, Config, ConfigError};
pub use diagnostics::{Diagnostic, Severity, Violation};
pub use document::{Document, ParseError, DEFAULT_LANGUAGE};
pub use engine::{LintEngine, LintReport, RuleBook};
pub use loader::{LoaderError, RuleLoader};
pub use node::{Axis, Node, EMPTY};
pub use project::{Project, ProjectError};
pub use rules::{compile, CompileError, Rule};
