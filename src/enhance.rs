//! Post-pass that makes diagnostics more actionable.
//!
//! Pure over the diagnostic list: each diagnostic is mapped to a refined
//! copy, nothing is added or removed.

use crate::codes::KnownCode;
use crate::element_registry::targets_states;
use crate::error::{Diagnostic, Related};
use crate::primitives::{closest_matches, first_quoted};
use crate::refs::{FIRST_DEFINED_HERE, RefGraph};

/// Suggestions farther than this edit distance are not offered.
pub const MAX_SUGGESTION_DISTANCE: usize = 2;

/// At most this many suggestions per diagnostic.
pub const MAX_SUGGESTIONS: usize = 3;

pub fn enhance(diagnostics: Vec<Diagnostic>, graph: &RefGraph) -> Vec<Diagnostic> {
    diagnostics
        .into_iter()
        .map(|d| enhance_one(d, graph))
        .collect()
}

fn enhance_one(diagnostic: Diagnostic, graph: &RefGraph) -> Diagnostic {
    match KnownCode::classify(&diagnostic.code) {
        KnownCode::DanglingReference => suggest_ids(diagnostic, graph),
        KnownCode::DuplicateId => link_first_definition(diagnostic, graph),
        KnownCode::InvalidAttribute => attribute_remediation(diagnostic),
        KnownCode::Other => diagnostic,
    }
}

// ─── E205 ────────────────────────────────────────────────────────────────────

fn suggest_ids(diagnostic: Diagnostic, graph: &RefGraph) -> Diagnostic {
    let Some(missing) = first_quoted(&diagnostic.message).map(str::to_string) else {
        return diagnostic;
    };
    let state_only = diagnostic
        .attribute
        .as_deref()
        .is_some_and(|attribute| targets_states(&diagnostic.tag, attribute));
    let suggestions = if state_only {
        closest_matches(
            &missing,
            graph.state_ids(),
            MAX_SUGGESTION_DISTANCE,
            MAX_SUGGESTIONS,
        )
    } else {
        closest_matches(
            &missing,
            graph.ids(),
            MAX_SUGGESTION_DISTANCE,
            MAX_SUGGESTIONS,
        )
    };
    match did_you_mean(&suggestions) {
        Some(hint) => diagnostic.with_hint(hint),
        None => diagnostic,
    }
}

/// `Did you mean "x"?` or `Did you mean one of "x", "y"?`.
pub fn did_you_mean(suggestions: &[&str]) -> Option<String> {
    match suggestions {
        [] => None,
        [one] => Some(format!("Did you mean \"{one}\"?")),
        many => {
            let quoted: Vec<String> = many.iter().map(|s| format!("\"{s}\"")).collect();
            Some(format!("Did you mean one of {}?", quoted.join(", ")))
        }
    }
}

// ─── E206 ────────────────────────────────────────────────────────────────────

fn link_first_definition(diagnostic: Diagnostic, graph: &RefGraph) -> Diagnostic {
    if !diagnostic.related.is_empty() {
        return diagnostic;
    }
    let first = first_quoted(&diagnostic.message).and_then(|id| graph.first_definition(id));
    match first {
        Some(position) if *position != diagnostic.position => {
            let position = position.clone();
            diagnostic.with_related(Related::new(FIRST_DEFINED_HERE, position))
        }
        _ => diagnostic,
    }
}

// ─── E204 ────────────────────────────────────────────────────────────────────

fn attribute_remediation(diagnostic: Diagnostic) -> Diagnostic {
    let attribute = diagnostic
        .attribute
        .clone()
        .or_else(|| first_quoted(&diagnostic.message).map(str::to_string));
    match (diagnostic.tag.as_str(), attribute.as_deref()) {
        ("send", Some("sendid")) => diagnostic
            .with_hint("use id to name a <send>; sendid is only valid on <cancel>"),
        ("transition", Some("priority")) => diagnostic
            .with_hint("transitions have no priority attribute; the first enabled transition in document order wins")
            .with_hint("reorder the <transition> elements to express precedence"),
        _ => diagnostic,
    }
}
