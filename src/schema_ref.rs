//! Embedded JSON Schema references.
//!
//! Root attributes in the schema namespace declare named schema sources:
//!
//! ```xml
//! <scxml xmlns:schema="urn:statechart:schema"
//!        schema:orders="file://schemas/orders.json"
//!        schema:shared="github.com/acme/contracts/json/shared.json">
//!   <datamodel>
//!     <data id="order" schema="orders:/definitions/order" expr='{"qty": 1}'/>
//!   </datamodel>
//! </scxml>
//! ```
//!
//! `schema` attributes on `<data>` and `<transition>` hold either inline JSON
//! or `<prefix>:/<json-pointer>`. Literal `<data>` payloads are checked against
//! the resolved schema; anything evaluated at run time is skipped.

use crate::codes;
use crate::config::Config;
use crate::dom::{
    attr, attribute_position, elements_named, local_name, node_position, offset_position,
};
use crate::error::{Diagnostic, SchemaLoadError};
use crate::fetch::{GITHUB_BRANCHES, github_raw_url, resolve_fetcher};
use regex::Regex;
use roxmltree::{Document, Node};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::LazyLock;

/// Namespace of root-level `schema:<prefix>` declarations.
pub const SCHEMA_NAMESPACE: &str = "urn:statechart:schema";

/// Any namespace bound to this prefix on the root is treated as the schema namespace.
pub const SCHEMA_PREFIX: &str = "schema";

static PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]*$").unwrap());

static POINTER_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9]*):(/.*)$").unwrap());

/// URIs treated as the schema-declaration namespace for this document.
pub fn schema_namespaces(root: Node<'_, '_>) -> Vec<String> {
    let mut out = vec![SCHEMA_NAMESPACE.to_string()];
    for ns in root.namespaces() {
        if ns.name() == Some(SCHEMA_PREFIX) && ns.uri() != SCHEMA_NAMESPACE {
            out.push(ns.uri().to_string());
        }
    }
    out
}

// ─── References ──────────────────────────────────────────────────────────────

/// Value of an element-level `schema` attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchemaReference {
    Inline(String),
    Pointer { prefix: String, pointer: String },
}

impl SchemaReference {
    pub fn parse(value: &str) -> Result<Self, String> {
        let trimmed = value.trim();
        if trimmed.starts_with('{') {
            return Ok(SchemaReference::Inline(trimmed.to_string()));
        }
        let caps = POINTER_REF_RE.captures(trimmed).ok_or_else(|| {
            format!(
                "schema reference \"{trimmed}\" must be inline JSON or <prefix>:/<json-pointer>"
            )
        })?;
        let pointer = &caps[2];
        Ok(SchemaReference::Pointer {
            prefix: caps[1].to_string(),
            pointer: if pointer == "/" {
                String::new()
            } else {
                pointer.to_string()
            },
        })
    }
}

/// Why a reference could not be turned into a schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolveError {
    InvalidInline(String),
    UnknownPrefix(String),
    Pointer { prefix: String, pointer: String },
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// Schemas loaded from root-level declarations, by prefix.
#[derive(Clone, Debug, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Value>,
}

impl SchemaRegistry {
    pub fn insert(&mut self, prefix: impl Into<String>, schema: Value) {
        self.schemas.insert(prefix.into(), schema);
    }

    pub fn get(&self, prefix: &str) -> Option<&Value> {
        self.schemas.get(prefix)
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Resolve a reference to a standalone schema value.
    ///
    /// Pointer fragments keep the root's `definitions`/`$defs` so internal
    /// `$ref`s still resolve.
    pub fn resolve(&self, reference: &SchemaReference) -> Result<Value, ResolveError> {
        match reference {
            SchemaReference::Inline(text) => serde_json::from_str(text)
                .map_err(|e| ResolveError::InvalidInline(e.to_string())),
            SchemaReference::Pointer { prefix, pointer } => {
                let root = self
                    .get(prefix)
                    .ok_or_else(|| ResolveError::UnknownPrefix(prefix.clone()))?;
                let mut fragment =
                    root.pointer(pointer)
                        .cloned()
                        .ok_or_else(|| ResolveError::Pointer {
                            prefix: prefix.clone(),
                            pointer: pointer.clone(),
                        })?;
                if !pointer.is_empty()
                    && let Value::Object(map) = &mut fragment
                {
                    for key in ["definitions", "$defs"] {
                        if let Some(defs) = root.get(key)
                            && !map.contains_key(key)
                        {
                            map.insert(key.to_string(), defs.clone());
                        }
                    }
                }
                Ok(fragment)
            }
        }
    }
}

// ─── Sources ─────────────────────────────────────────────────────────────────

/// Where a declared schema lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchemaSource {
    File(PathBuf),
    GitHub { urls: Vec<String> },
    Unsupported,
}

impl SchemaSource {
    /// Classify a declaration value; relative file paths resolve against `base`.
    pub fn classify(uri: &str, base: Option<&std::path::Path>) -> Self {
        if let Some(path) = uri.strip_prefix("file://") {
            let path = PathBuf::from(path);
            return match base {
                Some(base) if path.is_relative() => SchemaSource::File(base.join(path)),
                _ => SchemaSource::File(path),
            };
        }
        if let Some(rest) = uri.strip_prefix("github.com/") {
            let parts: Vec<&str> = rest.splitn(3, '/').collect();
            if let [user, repo, path] = parts.as_slice()
                && !user.is_empty()
                && !repo.is_empty()
                && !path.is_empty()
            {
                return SchemaSource::GitHub {
                    urls: GITHUB_BRANCHES
                        .iter()
                        .map(|branch| github_raw_url(user, repo, branch, path))
                        .collect(),
                };
            }
        }
        SchemaSource::Unsupported
    }
}

fn parse_json(location: &str, text: &str) -> Result<Value, SchemaLoadError> {
    serde_json::from_str(text).map_err(|e| SchemaLoadError::NotASchema {
        location: location.to_string(),
        reason: e.to_string(),
    })
}

fn load_source(source: &SchemaSource, uri: &str, config: &Config) -> Result<Value, SchemaLoadError> {
    match source {
        SchemaSource::File(path) => {
            let location = path.display().to_string();
            let text = std::fs::read_to_string(path).map_err(|e| SchemaLoadError::Io {
                path: location.clone(),
                reason: e.to_string(),
            })?;
            parse_json(&location, &text)
        }
        SchemaSource::GitHub { urls } => {
            let fetcher = resolve_fetcher(config)?;
            let mut last = None;
            for url in urls {
                match fetcher.fetch(url).map_err(SchemaLoadError::from) {
                    Ok(text) => match parse_json(url, &text) {
                        Ok(value) => return Ok(value),
                        Err(e) => last = Some(e),
                    },
                    Err(e) => last = Some(e),
                }
            }
            Err(SchemaLoadError::Exhausted {
                namespace: uri.to_string(),
                last: Box::new(last.unwrap_or_else(|| SchemaLoadError::Unsupported {
                    uri: uri.to_string(),
                })),
            })
        }
        SchemaSource::Unsupported => Err(SchemaLoadError::Unsupported {
            uri: uri.to_string(),
        }),
    }
}

// ─── Pass ────────────────────────────────────────────────────────────────────

/// Load every declared schema, then check each element-level reference.
pub fn validate_schema_refs(doc: &Document<'_>, config: &Config) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let (registry, failed) = load_declarations(doc, config, &mut diagnostics);

    let data_model = config
        .data_model
        .as_deref()
        .or_else(|| doc.root_element().attribute("datamodel"));
    let literal_checks = data_model != Some("null");

    for name in ["data", "transition"] {
        for node in elements_named(doc, name) {
            let Some(value) = node.attribute("schema") else {
                continue;
            };
            let Some(validator) =
                compile_reference(node, value, &registry, &failed, config, &mut diagnostics)
            else {
                continue;
            };
            if name == "data" && literal_checks {
                check_data_literal(node, &validator, config, &mut diagnostics);
            }
        }
    }

    diagnostics
}

fn load_declarations(
    doc: &Document<'_>,
    config: &Config,
    diagnostics: &mut Vec<Diagnostic>,
) -> (SchemaRegistry, BTreeSet<String>) {
    let root = doc.root_element();
    let file = config.source_name.as_str();
    let namespaces = schema_namespaces(root);
    let base = config
        .schema_base_path
        .as_deref()
        .or(config.invoke_base_path.as_deref());

    let mut registry = SchemaRegistry::default();
    let mut failed = BTreeSet::new();

    for declaration in root.attributes() {
        let Some(ns) = declaration.namespace() else {
            continue;
        };
        if !namespaces.iter().any(|n| n == ns) {
            continue;
        }
        let prefix = declaration.name();
        let uri = declaration.value();
        let position = offset_position(doc, declaration.range().start, file);
        let attribute = format!("{SCHEMA_PREFIX}:{prefix}");

        if !PREFIX_RE.is_match(prefix) {
            diagnostics.push(
                Diagnostic::error(
                    codes::SCHEMA_DECLARATION,
                    format!("schema prefix \"{prefix}\" must be a letter followed by letters or digits"),
                    position,
                    local_name(root),
                )
                .with_attribute(attribute),
            );
            failed.insert(prefix.to_string());
            continue;
        }

        let source = SchemaSource::classify(uri, base);
        if source == SchemaSource::Unsupported {
            diagnostics.push(
                Diagnostic::error(
                    codes::SCHEMA_DECLARATION,
                    format!("unsupported schema location \"{uri}\" for prefix \"{prefix}\""),
                    position,
                    local_name(root),
                )
                .with_attribute(attribute)
                .with_hint("use file://<path> or github.com/<user>/<repo>/<path>"),
            );
            failed.insert(prefix.to_string());
            continue;
        }

        match load_source(&source, uri, config) {
            Ok(schema) => {
                tracing::debug!(prefix, uri, "JSON schema loaded");
                registry.insert(prefix, schema);
            }
            Err(e) => {
                tracing::warn!(prefix, uri, error = %e, "JSON schema load failed");
                let code = match e {
                    SchemaLoadError::NotASchema { .. } => codes::SCHEMA_INVALID,
                    _ => codes::SCHEMA_LOAD,
                };
                diagnostics.push(
                    Diagnostic::error(
                        code,
                        format!("failed to load schema \"{prefix}\" from \"{uri}\": {e}"),
                        position,
                        local_name(root),
                    )
                    .with_attribute(attribute),
                );
                failed.insert(prefix.to_string());
            }
        }
    }

    (registry, failed)
}

fn compile_reference(
    node: Node<'_, '_>,
    value: &str,
    registry: &SchemaRegistry,
    failed: &BTreeSet<String>,
    config: &Config,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<jsonschema::Validator> {
    let file = config.source_name.as_str();
    let tag = local_name(node);
    let position = attribute_position(node, "schema", file);

    let reference = match SchemaReference::parse(value) {
        Ok(r) => r,
        Err(message) => {
            diagnostics.push(
                Diagnostic::error(codes::SCHEMA_REFERENCE_SYNTAX, message, position, tag)
                    .with_attribute("schema"),
            );
            return None;
        }
    };

    let schema = match registry.resolve(&reference) {
        Ok(schema) => schema,
        Err(ResolveError::UnknownPrefix(prefix)) if failed.contains(&prefix) => return None,
        Err(err) => {
            let (code, message) = match err {
                ResolveError::InvalidInline(reason) => (
                    codes::SCHEMA_INVALID,
                    format!("inline schema is not valid JSON: {reason}"),
                ),
                ResolveError::UnknownPrefix(prefix) => (
                    codes::SCHEMA_REFERENCE_UNRESOLVED,
                    format!("schema prefix \"{prefix}\" is not declared on the root element"),
                ),
                ResolveError::Pointer { prefix, pointer } => (
                    codes::SCHEMA_REFERENCE_UNRESOLVED,
                    format!("JSON pointer \"{pointer}\" does not resolve in schema \"{prefix}\""),
                ),
            };
            let mut d = Diagnostic::error(code, message, position, tag).with_attribute("schema");
            if code == codes::SCHEMA_REFERENCE_UNRESOLVED && registry.prefixes().next().is_some() {
                let declared: Vec<&str> = registry.prefixes().collect();
                d = d.with_hint(format!("declared prefixes: {}", declared.join(", ")));
            }
            diagnostics.push(d);
            return None;
        }
    };

    match jsonschema::options().build(&schema) {
        Ok(validator) => Some(validator),
        Err(e) => {
            diagnostics.push(
                Diagnostic::error(
                    codes::SCHEMA_INVALID,
                    format!("referenced schema is not a valid JSON Schema: {e}"),
                    position,
                    tag,
                )
                .with_attribute("schema"),
            );
            None
        }
    }
}

/// Validate a `<data>` payload when it is a JSON literal.
///
/// Mismatches are warnings: the same attribute may hold an expression in
/// another data model.
fn check_data_literal(
    node: Node<'_, '_>,
    validator: &jsonschema::Validator,
    config: &Config,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let file = config.source_name.as_str();
    let id = node.attribute("id").unwrap_or("");

    let (text, attribute) = match attr(node, "expr") {
        Some(expr) => (expr.trim().to_string(), Some("expr")),
        None if node.attribute("src").is_none() => {
            let body: String = node
                .children()
                .filter(Node::is_text)
                .filter_map(|c| c.text())
                .collect();
            let body = body.trim().to_string();
            if body.is_empty() {
                return;
            }
            (body, None)
        }
        None => return,
    };
    let position = match attribute {
        Some(a) => attribute_position(node, a, file),
        None => node_position(node, file),
    };

    let instance: Value = match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(_) => {
            if attribute.is_some() {
                diagnostics.push(
                    Diagnostic::info(
                        codes::DATA_NOT_LITERAL,
                        format!("data \"{id}\" expr is not a JSON literal; schema check skipped"),
                        position,
                        "data",
                    )
                    .with_attribute("expr"),
                );
            }
            return;
        }
    };

    for error in validator.iter_errors(&instance) {
        let path = error.instance_path.to_string();
        let path = if path.is_empty() { "/".to_string() } else { path };
        let mut d = Diagnostic::warning(
            codes::DATA_SCHEMA_MISMATCH,
            format!("data \"{id}\" does not match its schema at {path}: {error}"),
            position.clone(),
            "data",
        );
        if let Some(a) = attribute {
            d = d.with_attribute(a);
        }
        diagnostics.push(d);
    }
}
