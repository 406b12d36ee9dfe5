//! Validation settings, schema loader registration and the configuration file.

use crate::error::{ConfigError, SchemaLoadError};
use crate::fetch::SchemaFetcher;
use crate::rules::{SemanticRule, default_semantic_rules};
use crate::structural::{LoadedSchema, StructuralEngine, parse_xsd};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Signature of a namespace schema loader: namespace URI in, schema out.
pub type LoaderFn = dyn Fn(&str) -> Result<LoadedSchema, SchemaLoadError> + Send + Sync;

/// A schema loader selected when `pattern` matches a namespace URI.
#[derive(Clone)]
pub struct SchemaLoader {
    pub pattern: Regex,
    pub load: Arc<LoaderFn>,
}

impl SchemaLoader {
    pub fn new<F>(pattern: &str, load: F) -> Result<Self, regex::Error>
    where
        F: Fn(&str) -> Result<LoadedSchema, SchemaLoadError> + Send + Sync + 'static,
    {
        Ok(SchemaLoader {
            pattern: Regex::new(pattern)?,
            load: Arc::new(load),
        })
    }

    /// Serve `<directory>/<last namespace segment>.xsd` from disk.
    pub fn directory(pattern: &str, directory: impl Into<PathBuf>) -> Result<Self, regex::Error> {
        let directory = directory.into();
        SchemaLoader::new(pattern, move |namespace| {
            let path = directory.join(format!("{}.xsd", last_segment(namespace)));
            let text = std::fs::read_to_string(&path).map_err(|e| SchemaLoadError::Io {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            parse_xsd(namespace, &path.display().to_string(), text)
        })
    }

    pub fn matches(&self, namespace: &str) -> bool {
        self.pattern.is_match(namespace)
    }
}

impl fmt::Debug for SchemaLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaLoader")
            .field("pattern", &self.pattern.as_str())
            .finish_non_exhaustive()
    }
}

/// Last non-empty path segment of a namespace URI, without an `.xsd` suffix.
pub fn last_segment(namespace: &str) -> &str {
    let trimmed = namespace.trim_end_matches('/');
    let segment = trimmed
        .rsplit(|c: char| c == '/' || c == ':')
        .next()
        .unwrap_or(trimmed);
    segment.strip_suffix(".xsd").unwrap_or(segment)
}

/// Absolute paths of documents already validated in one recursive session.
///
/// Clones share the same set. A fresh set is created for every top-level
/// validation call, so unrelated calls never observe each other's entries.
#[derive(Clone, Debug, Default)]
pub struct VisitedFiles(Arc<Mutex<HashSet<PathBuf>>>);

impl VisitedFiles {
    /// Record `path`; returns `false` when it was already present.
    pub fn insert(&self, path: PathBuf) -> bool {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(path)
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Settings for one validation call.
///
/// Cloned into every recursive sub-validation; only `visited_files` is shared.
#[derive(Clone, Default)]
pub struct Config {
    /// Escalate every warning to an error once all passes have run.
    pub strict: bool,
    /// Overrides the document's `datamodel` attribute.
    pub data_model: Option<String>,
    /// File name stamped on every diagnostic position.
    pub source_name: String,
    pub recursive_invoke: bool,
    /// Directory against which relative `<invoke src>` paths resolve.
    pub invoke_base_path: Option<PathBuf>,
    /// Directory against which `file://` schema declarations resolve.
    pub schema_base_path: Option<PathBuf>,
    /// `None` runs [`default_semantic_rules`].
    pub semantic_rules: Option<Vec<Arc<dyn SemanticRule>>>,
    /// Tried before the built-in GitHub loader.
    pub schema_loaders: Vec<SchemaLoader>,
    pub structural_engine: Option<Arc<dyn StructuralEngine>>,
    /// `None` uses the HTTP fetcher when the `http-fetch` feature is enabled.
    pub fetcher: Option<Arc<dyn SchemaFetcher>>,
    pub(crate) visited_files: Option<VisitedFiles>,
}

impl Config {
    pub fn new() -> Self {
        Config::default()
    }

    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = name.into();
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_data_model(mut self, data_model: impl Into<String>) -> Self {
        self.data_model = Some(data_model.into());
        self
    }

    pub fn with_recursive_invoke(mut self, base_path: impl Into<PathBuf>) -> Self {
        self.recursive_invoke = true;
        self.invoke_base_path = Some(base_path.into());
        self
    }

    pub fn with_schema_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema_base_path = Some(path.into());
        self
    }

    pub fn with_semantic_rules(mut self, rules: Vec<Arc<dyn SemanticRule>>) -> Self {
        self.semantic_rules = Some(rules);
        self
    }

    pub fn with_schema_loader(mut self, loader: SchemaLoader) -> Self {
        self.schema_loaders.push(loader);
        self
    }

    pub fn with_structural_engine(mut self, engine: Arc<dyn StructuralEngine>) -> Self {
        self.structural_engine = Some(engine);
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn SchemaFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// The rule list this configuration runs.
    pub fn rules(&self) -> Vec<Arc<dyn SemanticRule>> {
        self.semantic_rules
            .clone()
            .unwrap_or_else(default_semantic_rules)
    }

    /// The shared visited set, if a recursive session is in progress.
    pub fn visited_files(&self) -> Option<&VisitedFiles> {
        self.visited_files.as_ref()
    }

    /// Start a recursive session unless one is already running.
    pub(crate) fn with_session(mut self) -> Self {
        if self.visited_files.is_none() {
            self.visited_files = Some(VisitedFiles::default());
        }
        self
    }

    /// Configuration for a document reached through `<invoke src>`.
    pub(crate) fn for_invoked(&self, src: &str, base: Option<PathBuf>) -> Self {
        let mut child = self.clone();
        child.source_name = src.to_string();
        child.invoke_base_path = base;
        child
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("strict", &self.strict)
            .field("data_model", &self.data_model)
            .field("source_name", &self.source_name)
            .field("recursive_invoke", &self.recursive_invoke)
            .field("invoke_base_path", &self.invoke_base_path)
            .field("schema_base_path", &self.schema_base_path)
            .field(
                "semantic_rules",
                &self
                    .semantic_rules
                    .as_ref()
                    .map(|rules| rules.iter().map(|r| r.name()).collect::<Vec<_>>()),
            )
            .field("schema_loaders", &self.schema_loaders)
            .field("structural_engine", &self.structural_engine.is_some())
            .field("fetcher", &self.fetcher.is_some())
            .finish_non_exhaustive()
    }
}

// ─── Configuration file ──────────────────────────────────────────────────────

/// A namespace pattern served from a local directory of `.xsd` files.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDirectory {
    pub pattern: String,
    pub directory: PathBuf,
}

/// On-disk settings, in YAML or JSON.
///
/// ```yaml
/// strict: true
/// recursive_invoke: true
/// invoke_base_path: machines
/// disabled_rules: [deadlock]
/// schema_directories:
///   - pattern: '^github\.com/acme/'
///     directory: schemas
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub strict: bool,
    pub data_model: Option<String>,
    pub recursive_invoke: bool,
    pub invoke_base_path: Option<PathBuf>,
    pub schema_base_path: Option<PathBuf>,
    pub disabled_rules: Vec<String>,
    pub schema_directories: Vec<SchemaDirectory>,
}

impl ConfigFile {
    pub fn from_yaml(input: &str) -> Result<Self, ConfigError> {
        serde_saphyr::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Read a configuration file; relative paths resolve against its directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;
        let mut file = ConfigFile::from_yaml(&text)?;
        if let Some(dir) = path.parent() {
            file.rebase(dir);
        }
        Ok(file)
    }

    fn rebase(&mut self, dir: &Path) {
        let rebase = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = dir.join(&*p);
            }
        };
        self.invoke_base_path.iter_mut().for_each(rebase);
        self.schema_base_path.iter_mut().for_each(rebase);
        for entry in &mut self.schema_directories {
            rebase(&mut entry.directory);
        }
    }

    pub fn into_config(self) -> Result<Config, ConfigError> {
        let mut config = Config {
            strict: self.strict,
            data_model: self.data_model,
            recursive_invoke: self.recursive_invoke,
            invoke_base_path: self.invoke_base_path,
            schema_base_path: self.schema_base_path,
            ..Config::default()
        };

        if !self.disabled_rules.is_empty() {
            let defaults = default_semantic_rules();
            for name in &self.disabled_rules {
                if !defaults.iter().any(|r| r.name() == name) {
                    return Err(ConfigError::UnknownRule(name.clone()));
                }
            }
            config.semantic_rules = Some(
                defaults
                    .into_iter()
                    .filter(|r| !self.disabled_rules.iter().any(|d| d == r.name()))
                    .collect(),
            );
        }

        for entry in self.schema_directories {
            let loader = SchemaLoader::directory(&entry.pattern, entry.directory).map_err(
                |source| ConfigError::Pattern {
                    pattern: entry.pattern.clone(),
                    source,
                },
            )?;
            config.schema_loaders.push(loader);
        }

        Ok(config)
    }
}
