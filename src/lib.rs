//! Semantic validation and diagnostics for SCXML-style state-machine documents.
//!
//! The crate checks documents written in an XML state-machine language (a
//! superset of SCXML) and reports structured diagnostics:
//!
//! ```text
//! parse(xml) → Document → validate(doc, config) → ValidationResult
//!                                                → serialize(result)      (JSON)
//!                                                → PrettyReporter::render (code frames)
//! ```
//!
//! Validation runs, in order: the structural adapter (namespace schemas, an
//! optional [`StructuralEngine`], id and IDREF checks), the semantic rules,
//! embedded JSON Schema references, a diagnostic enhancer that adds "did you
//! mean" hints, and, when enabled, recursive validation of invoked documents.
//!
//! # Quick Start
//!
//! ```rust
//! use statechart_lint::{Config, PrettyReporter, Validator};
//!
//! let xml = r#"<scxml version="1.0" initial="s0">
//!   <state id="s0">
//!     <transition event="go" target="acitve"/>
//!   </state>
//!   <state id="active"/>
//! </scxml>"#;
//!
//! let validator = Validator::new(Config::default().with_source_name("machine.scxml"));
//! let (result, _doc) = validator.validate_string(xml).expect("well-formed XML");
//! assert!(result.has_errors());
//!
//! let report = PrettyReporter::default()
//!     .with_source("machine.scxml", xml)
//!     .render(&result);
//! assert!(report.contains("Did you mean \"active\"?"));
//! ```
//!
//! # Feature Flags
//!
//! | Feature      | Default | Description |
//! |--------------|---------|-------------|
//! | `http-fetch` | yes     | Blocking HTTP schema retrieval via [`reqwest`](https://docs.rs/reqwest). Enables [`fetch::HttpFetcher`]. |

pub mod codes;
pub mod config;
pub mod enhance;
pub mod error;
pub mod fetch;
pub mod invoke;
pub mod parse;
pub mod pretty;
pub mod primitives;
pub mod refs;
pub mod rules;
pub mod schema_ref;
pub mod serialize;
pub mod source;
pub mod structural;
pub mod validate;

pub(crate) mod dom;
pub(crate) mod element_registry;

pub use config::{Config, ConfigFile, SchemaLoader};
pub use error::*;
pub use fetch::SchemaFetcher;
pub use pretty::{PrettyOptions, PrettyReporter};
pub use rules::SemanticRule;
pub use structural::{StructuralEngine, Violation};
pub use validate::Validator;

// Re-export entry-point functions at the crate root for convenience.
pub use parse::parse;
pub use serialize::serialize;
pub use validate::validate;

/// Read, parse and validate a file with `config`.
///
/// Shorthand for [`Validator::validate_file`].
pub fn validate_file(
    path: impl AsRef<std::path::Path>,
    config: Config,
) -> Result<ValidationResult, ValidateError> {
    Validator::new(config).validate_file(path.as_ref())
}
