//! Lint engine - applies compiled rules to documents

use crate::config::Config;
use crate::diagnostics::{Diagnostic, Violation};
use crate::document::Document;
use crate::project::{Project, ProjectError};
use crate::rules::Rule;
use crate::Severity;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Compiled rules, indexed by the file extensions they apply to
#[derive(Debug, Default, Clone)]
pub struct RuleBook {
    /// Rules in the order they were added
    rules: Vec<Arc<Rule>>,
    by_extension: HashMap<String, Vec<Arc<Rule>>>,
}

impl RuleBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule under each of its extensions
    pub fn add(&mut self, rule: Rule) {
        self.insert(Arc::new(rule));
    }

    fn insert(&mut self, rule: Arc<Rule>) {
        for extension in &rule.extensions {
            let key = extension.strip_prefix('.').unwrap_or(extension);
            self.by_extension
                .entry(key.to_string())
                .or_default()
                .push(Arc::clone(&rule));
        }
        self.rules.push(rule);
    }

    /// Rules for an extension, given as `htm`, `.htm` or a file name
    pub fn rules_for(&self, name: &str) -> &[Arc<Rule>] {
        let key = name.rsplit('.').next().unwrap_or(name);
        self.by_extension.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Rules for the extension of a path
    pub fn rules_for_path(&self, path: &Path) -> &[Arc<Rule>] {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.rules_for(ext))
            .unwrap_or(&[])
    }

    /// Keep only the rules matching a predicate
    pub fn retain<F: Fn(&Rule) -> bool>(self, keep: F) -> Self {
        let mut book = Self::new();
        for rule in self.rules.into_iter().filter(|rule| keep(Arc::as_ref(rule))) {
            book.insert(rule);
        }
        book
    }

    /// Registered extensions, sorted
    pub fn extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.by_extension.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        extensions
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FromIterator<Rule> for RuleBook {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        let mut book = Self::new();
        for rule in iter {
            book.add(rule);
        }
        book
    }
}

/// Results of linting one or more files
#[derive(Debug, Default, Clone)]
pub struct LintReport {
    pub diagnostics: Vec<Diagnostic>,
    /// Files that had rules and were parsed or attempted
    pub files_scanned: usize,
}

impl LintReport {
    /// Combine two reports
    pub fn merge(mut self, other: LintReport) -> Self {
        self.diagnostics.extend(other.diagnostics);
        self.files_scanned += other.files_scanned;
        self
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// Process exit code: 2 with errors, 1 with only warnings, 0 when clean
    pub fn exit_code(&self) -> u8 {
        if self.error_count() > 0 {
            2
        } else if self.warning_count() > 0 {
            1
        } else {
            0
        }
    }

    /// Order by file name, ignoring case, then by line
    pub fn sort(&mut self) {
        self.diagnostics.sort_by(|a, b| {
            let a_file = a.location.file.to_string_lossy().to_lowercase();
            let b_file = b.location.file.to_string_lossy().to_lowercase();
            a_file
                .cmp(&b_file)
                .then_with(|| a.location.line.cmp(&b.location.line))
        });
    }
}

/// The main lint engine
pub struct LintEngine {
    rulebook: RuleBook,
    config: Config,
}

impl LintEngine {
    /// Create a new lint engine, dropping rules the config disables
    pub fn new(rulebook: RuleBook, config: Config) -> Self {
        let rulebook = rulebook.retain(|rule| config.is_rule_enabled(&rule.source));
        Self { rulebook, config }
    }

    pub fn rulebook(&self) -> &RuleBook {
        &self.rulebook
    }

    /// Get count of active rules
    pub fn rule_count(&self) -> usize {
        self.rulebook.len()
    }

    /// Lint a parsed document, visiting nodes in document order
    pub fn lint_document(&self, doc: &Document, path: &Path) -> Vec<Diagnostic> {
        let rules = self.rulebook.rules_for_path(path);
        let mut diagnostics = Vec::new();
        for node in doc.nodes() {
            for rule in rules {
                if let Some(violation) = rule.apply(path, node) {
                    if self.config.should_report(violation.severity) {
                        diagnostics.push(Diagnostic::from(violation));
                    }
                }
            }
        }
        diagnostics
    }

    /// Lint one file; files without rules for their extension are skipped
    pub fn lint_file(&self, path: &Path, language: &str) -> LintReport {
        if self.rulebook.rules_for_path(path).is_empty() {
            return LintReport::default();
        }

        debug!("Linting {}", path.display());
        let diagnostics = match Document::parse_file(path, language) {
            Ok(doc) => self.lint_document(&doc, path),
            Err(e) => {
                warn!("Could not parse {}: {}", path.display(), e);
                vec![Diagnostic::from(Violation::unparsable(path))]
            }
        };

        LintReport {
            diagnostics,
            files_scanned: 1,
        }
    }

    /// Lint files in parallel and return a sorted report
    pub fn lint_files(&self, files: &[PathBuf], language: &str) -> LintReport {
        let lint_parallel = || {
            files
                .par_iter()
                .map(|file| self.lint_file(file, language))
                .reduce(LintReport::default, LintReport::merge)
        };

        let mut report = match self.config.jobs {
            1 => files
                .iter()
                .map(|file| self.lint_file(file, language))
                .fold(LintReport::default(), LintReport::merge),
            0 => lint_parallel(),
            jobs => match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
                Ok(pool) => pool.install(lint_parallel),
                Err(e) => {
                    warn!("Could not start {} workers: {}", jobs, e);
                    lint_parallel()
                }
            },
        };
        report.sort();

        info!(
            "Scanned {} files: {} errors, {} warnings",
            report.files_scanned,
            report.error_count(),
            report.warning_count()
        );
        report
    }

    /// Lint every file of a project, using the configured language if any
    pub fn lint_project(&self, project: &Project) -> Result<LintReport, ProjectError> {
        let files = project.files(&self.config)?;
        let language = self.config.language.as_deref().unwrap_or(&project.language);
        debug!("Found {} files under {}", files.len(), project.dir.display());
        Ok(self.lint_files(&files, language))
    }
}
