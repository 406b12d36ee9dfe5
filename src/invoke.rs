//! Cross-file validation of `<invoke type="scxml" src="...">`.

use crate::codes;
use crate::config::Config;
use crate::dom::{attr, attribute_position, elements_named};
use crate::error::{Diagnostic, ParseError, Position, Related};
use crate::parse::parse;
use crate::validate::validate;
use roxmltree::{Document, Node};
use std::path::{Path, PathBuf};

/// Type URI of an SCXML session, accepted with or without the trailing slash.
pub const SCXML_TYPE_URI: &str = "http://www.w3.org/TR/scxml/";

/// Whether an `<invoke type>` names another state-machine document.
pub fn is_scxml_type(value: &str) -> bool {
    value == "scxml" || value == SCXML_TYPE_URI || value == SCXML_TYPE_URI.trim_end_matches('/')
}

/// Absolute path of an invoked document.
///
/// A `file:` scheme is stripped and relative paths are joined to `base`.
pub fn resolve_src(src: &str, base: Option<&Path>) -> PathBuf {
    let raw = src
        .strip_prefix("file://")
        .or_else(|| src.strip_prefix("file:"))
        .unwrap_or(src);
    let path = Path::new(raw);
    let joined = match base {
        Some(base) if path.is_relative() => base.join(path),
        _ => path.to_path_buf(),
    };
    normalize_path(joined)
}

/// Canonical form when the file exists, otherwise the lexical absolute path.
pub(crate) fn normalize_path(path: PathBuf) -> PathBuf {
    path.canonicalize()
        .or_else(|_| std::path::absolute(&path))
        .unwrap_or(path)
}

/// Validate every invoked document reachable from `doc` and merge the results.
///
/// Does nothing unless `recursive_invoke` is set. Each absolute path is
/// validated at most once per session.
pub fn validate_invokes(doc: &Document<'_>, config: &Config) -> Vec<Diagnostic> {
    if !config.recursive_invoke {
        return Vec::new();
    }
    let mut out = Vec::new();
    for invoke in elements_named(doc, "invoke") {
        if !attr(invoke, "type").is_some_and(is_scxml_type) {
            continue;
        }
        let Some(src) = attr(invoke, "src") else {
            continue;
        };
        let path = resolve_src(src, config.invoke_base_path.as_deref());
        if let Some(visited) = config.visited_files()
            && !visited.insert(path.clone())
        {
            tracing::debug!(src, path = %path.display(), "invoked document already visited");
            continue;
        }
        out.extend(validate_invoked(invoke, src, &path, config));
    }
    out
}

fn validate_invoked(
    invoke: Node<'_, '_>,
    src: &str,
    path: &Path,
    config: &Config,
) -> Vec<Diagnostic> {
    let site = attribute_position(invoke, "src", &config.source_name);

    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(src, path = %path.display(), error = %e, "invoked document unreadable");
            return vec![
                Diagnostic::warning(
                    codes::INVOKE_UNREADABLE,
                    format!("cannot read invoked document \"{}\": {}", src, e),
                    site,
                    "invoke",
                )
                .with_attribute("src")
                .with_hint("ignore this if the document is generated at run time"),
            ];
        }
    };

    let text = match decode_utf8(bytes) {
        Ok(text) => text,
        Err(e) => return vec![malformed(src, site, e)],
    };
    let child = match parse(&text) {
        Ok(child) => child,
        Err(e) => return vec![malformed(src, site, e)],
    };

    tracing::debug!(src, path = %path.display(), "validating invoked document");
    let child_config = config.for_invoked(src, path.parent().map(Path::to_path_buf));
    let result = validate(&child, &child_config);
    let clean = !result.has_errors();

    let mut out: Vec<Diagnostic> = result
        .diagnostics
        .into_iter()
        .map(|d| {
            if d.position.file.is_empty() {
                d.with_file(src)
            } else {
                d
            }
        })
        .collect();
    if clean {
        out.push(
            Diagnostic::info(
                codes::INVOKE_VALID,
                format!("invoked document \"{src}\" validated with no errors"),
                site,
                "invoke",
            )
            .with_attribute("src"),
        );
    }
    out
}

/// Decode an invoked document; invalid UTF-8 is reported like any other parse failure.
pub(crate) fn decode_utf8(bytes: Vec<u8>) -> Result<String, ParseError> {
    String::from_utf8(bytes).map_err(|e| {
        let valid = &e.as_bytes()[..e.utf8_error().valid_up_to()];
        let line = valid.iter().filter(|b| **b == b'\n').count() + 1;
        let line_start = valid
            .iter()
            .rposition(|b| *b == b'\n')
            .map_or(0, |i| i + 1);
        let column = String::from_utf8_lossy(&valid[line_start..]).chars().count() + 1;
        ParseError {
            message: format!("invalid UTF-8: {}", e.utf8_error()),
            line,
            column,
        }
    })
}

fn malformed(src: &str, site: Position, error: ParseError) -> Diagnostic {
    Diagnostic::error(
        codes::INVOKE_MALFORMED,
        format!("invoked document \"{}\" is not well-formed: {}", src, error.message),
        site,
        "invoke",
    )
    .with_attribute("src")
    .with_related(Related::new(
        "parse error",
        Position::new(src, error.line, error.column, 0),
    ))
}
