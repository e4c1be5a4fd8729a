//! Output formatters for lint results

use crate::diagnostics::{Context, Diagnostic};
use crate::engine::LintReport;
use crate::markup::{self, Span};
use colored::Colorize;
use serde::Serialize;
use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::Path;

/// Path shown for a diagnostic, relative to `base` when possible
fn display_path(file: &Path, base: &Path) -> String {
    file.strip_prefix(base)
        .unwrap_or(file)
        .display()
        .to_string()
}

/// Render message markup for the terminal
pub fn render_message(message: &str) -> String {
    markup::parse(message)
        .iter()
        .map(|span| match span {
            Span::Text(text) => text.normal().to_string(),
            Span::Bold(text) => text.bold().to_string(),
            Span::Code(text) => text.cyan().to_string(),
        })
        .collect()
}

fn render_context(context: &Context) -> String {
    match context {
        Context::Excerpt(text) => format!("\"{}\"", text),
        Context::Reference(target) => format!("-> {}", target),
    }
}

/// Format a report as human-readable text, grouped by file
pub fn format_text(report: &LintReport, base: &Path) -> String {
    let mut out = String::new();
    let mut current_file: Option<&Path> = None;

    for diag in &report.diagnostics {
        if current_file != Some(diag.location.file.as_path()) {
            if current_file.is_some() {
                out.push('\n');
            }
            let _ = writeln!(out, "{}", display_path(&diag.location.file, base).underline());
            current_file = Some(diag.location.file.as_path());
        }

        let position = format!("{}:{}", diag.location.line, diag.location.column);
        let _ = write!(
            out,
            "  {:>7}  {:<7}  {}",
            position.dimmed(),
            diag.severity.colored(),
            render_message(&diag.message)
        );
        if let Some(ref element) = diag.element {
            let _ = write!(out, "  <{}>", element);
        }
        if let Some(ref context) = diag.context {
            let _ = write!(out, " {}", render_context(context).dimmed());
        }
        let _ = writeln!(out, "  {}", format!("[{}]", diag.source).dimmed());
    }

    if !report.diagnostics.is_empty() {
        out.push('\n');
    }
    out.push_str(&summary(report));
    out.push('\n');
    out
}

/// One-line tally of a report
pub fn summary(report: &LintReport) -> String {
    let files = report.files_scanned;
    let file_word = if files == 1 { "file" } else { "files" };
    let errors = report.error_count();
    let warnings = report.warning_count();

    if errors == 0 && warnings == 0 {
        format!("No issues found in {} {}", files, file_word)
    } else {
        format!(
            "Found {} error{} and {} warning{} in {} {}",
            errors,
            if errors == 1 { "" } else { "s" },
            warnings,
            if warnings == 1 { "" } else { "s" },
            files,
            file_word
        )
    }
}

/// JSON output format
#[derive(Serialize)]
struct JsonOutput<'a> {
    diagnostics: Vec<JsonDiagnostic<'a>>,
    summary: JsonSummary,
}

#[derive(Serialize)]
struct JsonDiagnostic<'a> {
    source: &'a str,
    severity: &'a str,
    message: &'a str,
    /// Message without markup
    text: String,
    file: String,
    line: usize,
    column: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    element: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a Context>,
}

#[derive(Serialize)]
struct JsonSummary {
    files: usize,
    total: usize,
    errors: usize,
    warnings: usize,
}

fn json_output<'a>(report: &'a LintReport, base: &Path) -> JsonOutput<'a> {
    let diagnostics = report
        .diagnostics
        .iter()
        .map(|d: &'a Diagnostic| JsonDiagnostic {
            source: &d.source,
            severity: d.severity.as_str(),
            message: &d.message,
            text: markup::plain(&markup::parse(&d.message)),
            file: display_path(&d.location.file, base),
            line: d.location.line,
            column: d.location.column,
            element: d.element.as_deref(),
            context: d.context.as_ref(),
        })
        .collect();

    JsonOutput {
        diagnostics,
        summary: JsonSummary {
            files: report.files_scanned,
            total: report.diagnostics.len(),
            errors: report.error_count(),
            warnings: report.warning_count(),
        },
    }
}

/// Format a report as pretty-printed JSON
pub fn format_json(report: &LintReport, base: &Path) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&json_output(report, base))
}

/// Print a report in text format
pub fn print_text(report: &LintReport, base: &Path) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle.write_all(format_text(report, base).as_bytes())
}

/// Print a report in JSON format
pub fn print_json(report: &LintReport, base: &Path) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, &json_output(report, base))?;
    writeln!(handle)
}
