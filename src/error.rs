use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Diagnostic severity level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A location in a source document.
///
/// `line` and `column` are 1-based when known. Zero means unknown; renderers
/// print `0:0` and suppress the code frame.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    pub fn new(file: impl Into<String>, line: usize, column: usize, offset: usize) -> Self {
        Position {
            file: file.into(),
            line,
            column,
            offset,
        }
    }

    /// A position that only names a file.
    pub fn file_only(file: impl Into<String>) -> Self {
        Position {
            file: file.into(),
            ..Position::default()
        }
    }

    pub fn is_known(&self) -> bool {
        self.line > 0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = if self.file.is_empty() {
            "<input>"
        } else {
            self.file.as_str()
        };
        write!(f, "{}:{}:{}", file, self.line, self.column)
    }
}

/// A secondary location that explains a diagnostic, e.g. a prior definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Related {
    pub label: String,
    pub position: Position,
}

impl Related {
    pub fn new(label: impl Into<String>, position: Position) -> Self {
        Related {
            label: label.into(),
            position,
        }
    }
}

/// A structured diagnostic produced by any validation pass.
///
/// Diagnostics are values: passes that refine them (the enhancer, strict-mode
/// escalation) build new diagnostics through the `with_*` methods.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub message: String,
    pub position: Position,
    /// Local name of the element that owns the diagnostic.
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<Related>,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        code: &str,
        message: impl Into<String>,
        position: Position,
        tag: &str,
    ) -> Self {
        Diagnostic {
            severity,
            code: code.to_string(),
            message: message.into(),
            position,
            tag: tag.to_string(),
            attribute: None,
            spec_ref: None,
            hints: Vec::new(),
            related: Vec::new(),
        }
    }

    pub fn error(code: &str, message: impl Into<String>, position: Position, tag: &str) -> Self {
        Diagnostic::new(Severity::Error, code, message, position, tag)
    }

    pub fn warning(code: &str, message: impl Into<String>, position: Position, tag: &str) -> Self {
        Diagnostic::new(Severity::Warning, code, message, position, tag)
    }

    pub fn info(code: &str, message: impl Into<String>, position: Position, tag: &str) -> Self {
        Diagnostic::new(Severity::Info, code, message, position, tag)
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    pub fn with_spec_ref(mut self, spec_ref: impl Into<String>) -> Self {
        self.spec_ref = Some(spec_ref.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    pub fn with_related(mut self, related: Related) -> Self {
        self.related.push(related);
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.position.file = file.into();
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Source order: file, line, column, then code.
    pub fn source_order(&self, other: &Diagnostic) -> Ordering {
        self.position
            .file
            .cmp(&other.position.file)
            .then(self.position.line.cmp(&other.position.line))
            .then(self.position.column.cmp(&other.position.column))
            .then_with(|| self.code.cmp(&other.code))
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}[{}] {}",
            self.position, self.severity, self.code, self.message
        )
    }
}

/// Per-severity totals for a [`ValidationResult`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counts {
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
}

impl Counts {
    pub fn total(&self) -> usize {
        self.errors + self.warnings + self.infos
    }
}

/// Result of validating one document (and, recursively, the documents it invokes).
///
/// Aggregation is append-only; diagnostics are never deduplicated.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        ValidationResult { diagnostics }
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.with_severity(Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.with_severity(Severity::Warning)
    }

    pub fn infos(&self) -> impl Iterator<Item = &Diagnostic> {
        self.with_severity(Severity::Info)
    }

    fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |d| d.severity == severity)
    }

    /// All diagnostics carrying `code`.
    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.code == code)
    }

    pub fn counts(&self) -> Counts {
        let mut counts = Counts::default();
        for d in &self.diagnostics {
            match d.severity {
                Severity::Error => counts.errors += 1,
                Severity::Warning => counts.warnings += 1,
                Severity::Info => counts.infos += 1,
            }
        }
        counts
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    /// Append every diagnostic of `other`, keeping its order.
    pub fn merge(&mut self, other: ValidationResult) {
        self.diagnostics.extend(other.diagnostics);
    }

    /// Stable ascending sort by file, line, column and code.
    pub fn sort(&mut self) {
        self.diagnostics.sort_by(Diagnostic::source_order);
    }

    /// Strict mode: every warning becomes an error. Infos are untouched.
    pub fn escalate_warnings(self) -> Self {
        ValidationResult {
            diagnostics: self
                .diagnostics
                .into_iter()
                .map(|d| {
                    if d.severity == Severity::Warning {
                        d.with_severity(Severity::Error)
                    } else {
                        d
                    }
                })
                .collect(),
        }
    }
}

/// Produced by [`crate::parse`] when the input is not well-formed XML.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{line}:{column}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

/// Fatal errors of the file-level entry points.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of the schema retrieval transport.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("GET {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("GET {url} failed: {reason}")]
    Transport { url: String, reason: String },
    #[error("schema transport unavailable: {0}")]
    Unavailable(String),
}

/// Failure to load a schema, either an XSD for a namespace or a declared JSON schema.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SchemaLoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("failed to read {path}: {reason}")]
    Io { path: String, reason: String },
    #[error("{location} is not a usable schema: {reason}")]
    NotASchema { location: String, reason: String },
    #[error("'{uri}' is not a recognised schema location")]
    Unsupported { uri: String },
    #[error("no schema found for '{namespace}' (last error: {last})")]
    Exhausted {
        namespace: String,
        last: Box<SchemaLoadError>,
    },
}

/// Errors while reading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(String),
    #[error("invalid namespace pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("unknown semantic rule '{0}'")]
    UnknownRule(String),
}

/// Serialization error.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SerializeError {
    pub message: String,
}
