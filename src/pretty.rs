//! Human-readable report with code frames.
//!
//! ```text
//! machine.scxml:4:28: error[E205] reference "acitve" in transition@target does not match any id in this document
//!   hint: Did you mean "active"?
//!   |
//! 3 |   <state id="s0">
//! 4 |     <transition event="go" target="acitve"/>
//!   |                                    ^~~~~~
//! 5 |   </state>
//!
//! summary: 1 error(s), 0 warning(s), 1 total
//! ```

use crate::error::{Counts, Diagnostic, Position, Severity, ValidationResult};
use crate::primitives::{attribute_value_span, expand_tabs, visual_column};
use crate::source::SourceIndex;
use owo_colors::OwoColorize;
use roxmltree::{Document, Node};
use std::collections::HashMap;
use std::fmt::Write;

/// Layout knobs for [`PrettyReporter`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrettyOptions {
    pub context_before: usize,
    pub context_after: usize,
    /// Extend the frame to the end of the element owning the diagnostic.
    pub expand_element: bool,
    /// Upper bound on frame height when `expand_element` is set.
    pub max_expand_lines: usize,
    /// ANSI colours: red errors, yellow warnings, cyan hints.
    pub color: bool,
    /// Print a one-line frame under each related note.
    pub related_frames: bool,
}

impl Default for PrettyOptions {
    fn default() -> Self {
        PrettyOptions {
            context_before: 1,
            context_after: 1,
            expand_element: false,
            max_expand_lines: 12,
            color: false,
            related_frames: true,
        }
    }
}

/// Source extent of one element, by byte offset and 1-based line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ElementSpan {
    start: usize,
    end: usize,
    first_line: usize,
    last_line: usize,
}

#[derive(Clone, Debug, Default)]
struct SourceFile {
    lines: SourceIndex,
    elements: Vec<ElementSpan>,
}

impl SourceFile {
    fn new(text: &str) -> Self {
        // Frames still render for malformed text, only without element expansion.
        let elements = match Document::parse(text) {
            Ok(doc) => doc
                .descendants()
                .filter(Node::is_element)
                .map(|node| {
                    let range = node.range();
                    ElementSpan {
                        start: range.start,
                        end: range.end,
                        first_line: doc.text_pos_at(range.start).row as usize,
                        last_line: doc.text_pos_at(range.end.saturating_sub(1)).row as usize,
                    }
                })
                .collect(),
            Err(_) => Vec::new(),
        };
        SourceFile {
            lines: SourceIndex::new(text),
            elements,
        }
    }

    /// Last line of the innermost element enclosing `position`.
    fn element_last_line(&self, position: &Position) -> Option<usize> {
        let line = position.line;
        self.elements
            .iter()
            .filter(|e| e.start <= position.offset && position.offset < e.end)
            .filter(|e| e.first_line <= line && line <= e.last_line)
            .min_by_key(|e| e.end - e.start)
            .or_else(|| self.elements.iter().find(|e| e.first_line == line))
            .map(|e| e.last_line)
    }
}

/// Renders a [`ValidationResult`] as text, one block per diagnostic.
#[derive(Clone, Debug, Default)]
pub struct PrettyReporter {
    options: PrettyOptions,
    sources: HashMap<String, SourceFile>,
}

impl PrettyReporter {
    pub fn new(options: PrettyOptions) -> Self {
        PrettyReporter {
            options,
            sources: HashMap::new(),
        }
    }

    /// Register the text of `file` so its diagnostics get code frames.
    pub fn with_source(mut self, file: impl Into<String>, text: &str) -> Self {
        self.sources.insert(file.into(), SourceFile::new(text));
        self
    }

    pub fn options(&self) -> &PrettyOptions {
        &self.options
    }

    /// Diagnostics in ascending (file, line, column, code) order, then a summary.
    pub fn render(&self, result: &ValidationResult) -> String {
        let mut diagnostics: Vec<&Diagnostic> = result.diagnostics.iter().collect();
        diagnostics.sort_by(|a, b| a.source_order(b));

        let mut out = String::new();
        for diagnostic in diagnostics {
            self.render_diagnostic(&mut out, diagnostic);
            out.push('\n');
        }
        out.push_str(&summary(&result.counts()));
        out.push('\n');
        out
    }

    fn render_diagnostic(&self, out: &mut String, d: &Diagnostic) {
        let label = format!("{}[{}]", d.severity, d.code);
        let _ = writeln!(
            out,
            "{}: {} {}",
            d.position,
            self.paint(&label, d.severity),
            d.message
        );
        for hint in &d.hints {
            let _ = writeln!(out, "  {} {}", self.hint_label(), hint);
        }
        for related in &d.related {
            let _ = writeln!(out, "  note: {} ({})", related.label, related.position);
            if self.options.related_frames
                && let Some(source) = self.source_for(&related.position)
                && let Some(text) = source.lines.line(related.position.line)
            {
                let width = digits(related.position.line);
                write_line(out, width, related.position.line, text);
            }
        }
        if let Some(source) = self.source_for(&d.position) {
            self.render_frame(out, source, d);
        }
    }

    fn render_frame(&self, out: &mut String, source: &SourceFile, d: &Diagnostic) {
        let line = d.position.line;
        let Some(text) = source.lines.line(line) else {
            return;
        };

        let mut last = line + self.options.context_after;
        if self.options.expand_element
            && let Some(end) = source.element_last_line(&d.position)
        {
            let bound = line + self.options.max_expand_lines.saturating_sub(1);
            last = last.max(end.min(bound));
        }
        let (first, last) = source
            .lines
            .clamp(line.saturating_sub(self.options.context_before), last);
        let width = digits(last);

        let _ = writeln!(out, "{:>width$} |", "");
        for n in first..=last {
            if let Some(content) = source.lines.line(n) {
                write_line(out, width, n, content);
            }
            if n == line {
                let (indent, caret) = caret(text, d);
                let _ = writeln!(
                    out,
                    "{:>width$} | {}{}",
                    "",
                    " ".repeat(indent),
                    self.paint(&caret, d.severity)
                );
            }
        }
    }

    fn source_for(&self, position: &Position) -> Option<&SourceFile> {
        if !position.is_known() {
            return None;
        }
        self.sources.get(&position.file)
    }

    fn paint(&self, text: &str, severity: Severity) -> String {
        if !self.options.color {
            return text.to_string();
        }
        match severity {
            Severity::Error => text.red().bold().to_string(),
            Severity::Warning => text.yellow().bold().to_string(),
            Severity::Info => text.bold().to_string(),
        }
    }

    fn hint_label(&self) -> String {
        if self.options.color {
            "hint:".cyan().to_string()
        } else {
            "hint:".to_string()
        }
    }
}

fn write_line(out: &mut String, width: usize, number: usize, text: &str) {
    let expanded = expand_tabs(text);
    if expanded.is_empty() {
        let _ = writeln!(out, "{number:>width$} |");
    } else {
        let _ = writeln!(out, "{number:>width$} | {expanded}");
    }
}

/// Visual indent and caret text for a diagnostic on `line`.
///
/// With a known attribute the caret spans the attribute value; otherwise it
/// is a single `^` under the reported column.
fn caret(line: &str, d: &Diagnostic) -> (usize, String) {
    let span = d
        .attribute
        .as_deref()
        .and_then(|attribute| attribute_value_span(line, d.position.column, attribute));
    match span {
        Some((value_column, len)) if len > 0 => {
            let start = visual_column(line, value_column);
            let end = visual_column(line, value_column + len);
            let width = end.saturating_sub(start).max(1);
            (start, format!("^{}", "~".repeat(width - 1)))
        }
        _ => (visual_column(line, d.position.column), "^".to_string()),
    }
}

fn digits(n: usize) -> usize {
    n.max(1).to_string().len()
}

pub fn summary(counts: &Counts) -> String {
    format!(
        "summary: {} error(s), {} warning(s), {} total",
        counts.errors,
        counts.warnings,
        counts.total()
    )
}
