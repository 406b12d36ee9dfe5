//! Bridge to the generic XSD engine.
//!
//! Discovers the namespaces a document uses, resolves each to a schema
//! through an ordered list of pattern-matched loaders, runs the configured
//! [`StructuralEngine`], converts its violations, and appends the id and
//! IDREF checks the engine does not perform.

use crate::codes;
use crate::config::{Config, SchemaLoader};
use crate::dom::node_position;
use crate::element_registry::is_reserved_token;
use crate::error::{Diagnostic, Position, Related, SchemaLoadError, Severity};
use crate::fetch::{GITHUB_BRANCHES, SchemaFetcher, github_raw_url, resolve_fetcher};
use crate::primitives::first_quoted;
use crate::refs::RefGraph;
use crate::schema_ref::schema_namespaces;
use regex::Regex;
use roxmltree::{Document, Node};
use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};

pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

static GITHUB_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^github\.com/.*").unwrap());

/// A schema document resolved for one namespace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedSchema {
    pub namespace: String,
    /// Where the schema came from (URL or path).
    pub location: String,
    pub text: String,
}

/// Accept `text` only if it parses and its root element is `<schema>`.
pub fn parse_xsd(
    namespace: &str,
    location: &str,
    text: String,
) -> Result<LoadedSchema, SchemaLoadError> {
    let root = match Document::parse(&text) {
        Ok(doc) => doc.root_element().tag_name().name().to_string(),
        Err(e) => {
            return Err(SchemaLoadError::NotASchema {
                location: location.to_string(),
                reason: e.to_string(),
            });
        }
    };
    if root != "schema" {
        return Err(SchemaLoadError::NotASchema {
            location: location.to_string(),
            reason: format!("root element is <{root}>, expected <schema>"),
        });
    }
    Ok(LoadedSchema {
        namespace: namespace.to_string(),
        location: location.to_string(),
        text,
    })
}

/// Schemas resolved for the namespaces of one document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchemaSet {
    schemas: Vec<LoadedSchema>,
}

impl SchemaSet {
    pub fn push(&mut self, schema: LoadedSchema) {
        self.schemas.push(schema);
    }

    pub fn get(&self, namespace: &str) -> Option<&LoadedSchema> {
        self.schemas.iter().find(|s| s.namespace == namespace)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoadedSchema> {
        self.schemas.iter()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// A violation reported by the generic engine. Same shape as [`Diagnostic`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub severity: Severity,
    pub code: String,
    pub message: String,
    pub position: Position,
    pub tag: String,
    pub attribute: Option<String>,
    pub spec_ref: Option<String>,
    pub hints: Vec<String>,
    pub related: Vec<Related>,
}

impl From<Violation> for Diagnostic {
    fn from(v: Violation) -> Self {
        Diagnostic {
            severity: v.severity,
            code: v.code,
            message: v.message,
            position: v.position,
            tag: v.tag,
            attribute: v.attribute,
            spec_ref: v.spec_ref,
            hints: v.hints,
            related: v.related,
        }
    }
}

/// The generic schema engine: element/attribute legality, content models,
/// type facets. Implementations receive every schema the loaders resolved;
/// namespaces no loader matched are left to the engine's own built-ins.
pub trait StructuralEngine: Send + Sync {
    fn validate(&self, schemas: &SchemaSet, doc: &Document<'_>, file: &str) -> Vec<Violation>;
}

// ─── Namespace discovery ─────────────────────────────────────────────────────

/// Namespaces declared on the root or used by any element or attribute,
/// excluding XML, XSI and schema-declaration namespaces.
pub fn document_namespaces(doc: &Document<'_>) -> BTreeSet<String> {
    let root = doc.root_element();
    let excluded = schema_namespaces(root);
    let mut out = BTreeSet::new();
    let mut add = |uri: &str| {
        if !uri.is_empty()
            && uri != XML_NAMESPACE
            && uri != XSI_NAMESPACE
            && !excluded.iter().any(|e| e == uri)
        {
            out.insert(uri.to_string());
        }
    };

    for ns in root.namespaces() {
        add(ns.uri());
    }
    for node in doc.descendants().filter(Node::is_element) {
        if let Some(uri) = node.tag_name().namespace() {
            add(uri);
        }
        for attr in node.attributes() {
            if let Some(uri) = attr.namespace() {
                add(uri);
            }
        }
    }
    out
}

// ─── GitHub loader ───────────────────────────────────────────────────────────

/// Candidate raw-content URLs for a `github.com/<user>/<repo>[/<subpath>]`
/// namespace: the repository-named schema first, then the schema named after
/// the last subpath segment, on `main` and then on `master`.
pub fn github_schema_urls(namespace: &str) -> Option<Vec<String>> {
    let rest = namespace.strip_prefix("github.com/")?;
    let mut parts = rest.split('/').filter(|s| !s.is_empty());
    let user = parts.next()?;
    let repo = parts.next()?;
    let subpath: Vec<&str> = parts.collect();

    let mut files = vec![format!("{repo}.xsd")];
    if let Some(last) = subpath.last() {
        files.push(format!("{}/{}.xsd", subpath.join("/"), last));
    }

    Some(
        GITHUB_BRANCHES
            .iter()
            .flat_map(|branch| {
                files
                    .iter()
                    .map(move |file| github_raw_url(user, repo, branch, file))
            })
            .collect(),
    )
}

/// Try every candidate URL; the first body that parses as an XSD wins.
pub fn load_from_github(
    fetcher: &dyn SchemaFetcher,
    namespace: &str,
) -> Result<LoadedSchema, SchemaLoadError> {
    let urls = github_schema_urls(namespace).ok_or_else(|| SchemaLoadError::Unsupported {
        uri: namespace.to_string(),
    })?;

    let mut last = None;
    for url in urls {
        let attempt = fetcher
            .fetch(&url)
            .map_err(SchemaLoadError::from)
            .and_then(|text| parse_xsd(namespace, &url, text));
        match attempt {
            Ok(schema) => {
                tracing::debug!(namespace, url = %url, "schema resolved");
                return Ok(schema);
            }
            Err(e) => {
                tracing::debug!(namespace, url = %url, error = %e, "schema candidate rejected");
                last = Some(e);
            }
        }
    }

    Err(SchemaLoadError::Exhausted {
        namespace: namespace.to_string(),
        last: Box::new(last.unwrap_or_else(|| SchemaLoadError::Unsupported {
            uri: namespace.to_string(),
        })),
    })
}

/// The built-in loader for `github.com/...` namespaces.
pub fn github_loader(fetcher: Arc<dyn SchemaFetcher>) -> SchemaLoader {
    SchemaLoader {
        pattern: GITHUB_RE.clone(),
        load: Arc::new(move |namespace| load_from_github(fetcher.as_ref(), namespace)),
    }
}

// ─── Adapter ─────────────────────────────────────────────────────────────────

/// Structural pass: schema resolution, generic engine, then id/IDREF checks.
///
/// A namespace whose matched loader fails yields a single fatal diagnostic
/// and nothing else; the engine cannot run without its schema.
pub fn validate_structure(doc: &Document<'_>, config: &Config, graph: &RefGraph) -> Vec<Diagnostic> {
    let file = config.source_name.as_str();
    let root = doc.root_element();
    let namespaces = document_namespaces(doc);
    tracing::debug!(count = namespaces.len(), "namespaces discovered");

    let mut loaders = config.schema_loaders.clone();
    let needs_github = namespaces
        .iter()
        .any(|ns| GITHUB_RE.is_match(ns) && !loaders.iter().any(|l| l.matches(ns)));
    if needs_github {
        match resolve_fetcher(config) {
            Ok(fetcher) => loaders.push(github_loader(fetcher)),
            Err(e) => {
                return vec![
                    Diagnostic::error(
                        codes::STRUCTURAL_SETUP,
                        format!("cannot set up schema retrieval: {e}"),
                        node_position(root, file),
                        root.tag_name().name(),
                    )
                    .with_hint("configure a schema fetcher or a local schema loader"),
                ];
            }
        }
    }

    let mut schemas = SchemaSet::default();
    for namespace in &namespaces {
        let Some(loader) = loaders.iter().find(|l| l.matches(namespace)) else {
            tracing::debug!(namespace = %namespace, "no schema loader matches; left to the engine");
            continue;
        };
        match (loader.load)(namespace) {
            Ok(schema) => schemas.push(schema),
            Err(e) => {
                tracing::warn!(namespace = %namespace, error = %e, "schema load failed");
                return vec![
                    Diagnostic::error(
                        codes::NAMESPACE_SCHEMA_UNAVAILABLE,
                        format!("failed to load schema for namespace \"{namespace}\": {e}"),
                        node_position(root, file),
                        root.tag_name().name(),
                    )
                    .with_attribute("xmlns")
                    .with_hint("structural validation was skipped for this document"),
                ];
            }
        }
    }

    let mut diagnostics = Vec::new();
    if let Some(engine) = &config.structural_engine {
        diagnostics.extend(
            engine
                .validate(&schemas, doc, file)
                .into_iter()
                .map(Diagnostic::from)
                .filter(|d| !is_reserved_reference(d)),
        );
    }
    diagnostics.extend(graph.diagnostics().iter().cloned());
    diagnostics
}

/// A dangling-reference diagnostic whose target is a `#_` pseudo-target.
fn is_reserved_reference(diagnostic: &Diagnostic) -> bool {
    diagnostic.code == codes::DANGLING_REFERENCE
        && first_quoted(&diagnostic.message).is_some_and(is_reserved_token)
}
