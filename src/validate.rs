//! Validation pipeline.
//!
//! Returns **all** diagnostics, not just the first. Validation never modifies
//! the document.
//!
//! ```text
//! structural (+ ids/IDREFs) → semantic rules → schema references
//!     → enhancer → recursive invoke → strict escalation
//! ```

use crate::config::Config;
use crate::enhance::enhance;
use crate::error::{ParseError, ValidateError, ValidationResult};
use crate::invoke::{decode_utf8, normalize_path, validate_invokes};
use crate::parse::parse;
use crate::refs::RefGraph;
use crate::rules::run_rules;
use crate::schema_ref::validate_schema_refs;
use crate::structural::validate_structure;
use roxmltree::Document;
use std::path::Path;

/// Validate a parsed document.
///
/// Starts a recursive-invoke session unless `config` already belongs to one.
pub fn validate(doc: &Document<'_>, config: &Config) -> ValidationResult {
    let config = config.clone().with_session();
    let file = config.source_name.as_str();

    let graph = RefGraph::build(doc, file);
    let mut own = validate_structure(doc, &config, &graph);
    own.extend(run_rules(doc, &config));
    own.extend(validate_schema_refs(doc, &config));

    // Child documents are enhanced by their own call.
    let mut result = ValidationResult::new(enhance(own, &graph));
    result.extend(validate_invokes(doc, &config));

    if config.strict {
        result = result.escalate_warnings();
    }

    let counts = result.counts();
    tracing::debug!(
        file,
        errors = counts.errors,
        warnings = counts.warnings,
        infos = counts.infos,
        "validation finished"
    );
    result
}

/// Entry points bound to one [`Config`].
#[derive(Clone, Debug, Default)]
pub struct Validator {
    config: Config,
}

impl Validator {
    pub fn new(config: Config) -> Self {
        Validator { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Parse and validate XML text. The parsed tree is returned alongside the
    /// result so callers can render code frames from it.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the text is not well-formed; no tree exists
    /// to attach diagnostics to.
    pub fn validate_string<'input>(
        &self,
        xml: &'input str,
    ) -> Result<(ValidationResult, Document<'input>), ParseError> {
        let doc = parse(xml)?;
        let result = validate(&doc, &self.config);
        Ok((result, doc))
    }

    /// Validate an already parsed document; its source text is
    /// [`Document::input_text`].
    pub fn validate_document(&self, doc: &Document<'_>) -> ValidationResult {
        validate(doc, &self.config)
    }

    /// Read, parse and validate a file.
    ///
    /// The file is marked visited before validation so a document invoking
    /// itself is not validated twice. Unless configured otherwise, the file
    /// name becomes the source name and its directory the invoke base path.
    ///
    /// # Errors
    ///
    /// Returns [`ValidateError::Io`] if the file cannot be read and
    /// [`ValidateError::Parse`] if it is not UTF-8 or not well-formed XML.
    pub fn validate_file(&self, path: &Path) -> Result<ValidationResult, ValidateError> {
        let bytes = std::fs::read(path).map_err(|source| ValidateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let text = decode_utf8(bytes)?;

        let mut config = self.config.clone().with_session();
        if config.source_name.is_empty() {
            config.source_name = path.display().to_string();
        }
        if config.invoke_base_path.is_none() {
            config.invoke_base_path = path.parent().map(Path::to_path_buf);
        }
        if let Some(visited) = config.visited_files() {
            visited.insert(normalize_path(path.to_path_buf()));
        }

        let doc = parse(&text)?;
        Ok(validate(&doc, &config))
    }
}
