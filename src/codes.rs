//! The fixed table of diagnostic codes.
//!
//! Codes are grouped by range: `E0xx` setup, `E2xx` structure and references,
//! `E30x` formats, `E31x` mutual exclusion, `E32x` cardinality, `E33x` tree
//! relationships, `x34x` liveness, `x35x` embedded JSON schemas, `x50x`
//! recursive invocation. The leading letter mirrors the default severity.

// ─── Setup ───────────────────────────────────────────────────────────────────

pub const STRUCTURAL_SETUP: &str = "E001";
pub const NAMESPACE_SCHEMA_UNAVAILABLE: &str = "E002";

// ─── Structure and references ────────────────────────────────────────────────

pub const INVALID_VALUE: &str = "E201";
pub const UNEXPECTED_ELEMENT: &str = "E202";
pub const MISSING_ATTRIBUTE: &str = "E203";
pub const INVALID_ATTRIBUTE: &str = "E204";
pub const DANGLING_REFERENCE: &str = "E205";
pub const DUPLICATE_ID: &str = "E206";

// ─── Semantic rules ──────────────────────────────────────────────────────────

pub const ID_FORMAT: &str = "E301";
pub const EVENT_FORMAT: &str = "E302";
pub const PARAM_SOURCE: &str = "E310";
pub const CANCEL_TARGET: &str = "E311";
pub const SEND_EVENT_CONTENT: &str = "E312";
pub const SEND_NAMELIST_CONTENT: &str = "E313";
pub const INVOKE_SOURCE: &str = "E314";
pub const DONEDATA_CONTENT: &str = "E315";
pub const INITIAL_TRANSITION_COUNT: &str = "E320";
pub const INITIAL_TRANSITION_SHAPE: &str = "E330";
pub const INITIAL_TARGET_SCOPE: &str = "E331";
pub const HISTORY_TARGET_SCOPE: &str = "E332";
pub const EMPTY_TRANSITION: &str = "E333";
pub const INITIAL_CONFLICT: &str = "E334";
pub const ATOMIC_INITIAL: &str = "E335";
pub const POSSIBLE_DEADLOCK: &str = "W340";
pub const UNCONDITIONAL_CYCLE: &str = "E341";

// ─── Embedded JSON schemas ───────────────────────────────────────────────────

pub const SCHEMA_DECLARATION: &str = "E350";
pub const SCHEMA_LOAD: &str = "E351";
pub const SCHEMA_REFERENCE_SYNTAX: &str = "E352";
pub const SCHEMA_REFERENCE_UNRESOLVED: &str = "E353";
pub const DATA_SCHEMA_MISMATCH: &str = "W354";
pub const DATA_NOT_LITERAL: &str = "I355";
pub const SCHEMA_INVALID: &str = "E356";

// ─── Recursive invoke ────────────────────────────────────────────────────────

pub const INVOKE_UNREADABLE: &str = "W500";
pub const INVOKE_MALFORMED: &str = "E501";
pub const INVOKE_VALID: &str = "I502";

/// Codes the enhancer knows how to refine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KnownCode {
    DanglingReference,
    DuplicateId,
    InvalidAttribute,
    Other,
}

impl KnownCode {
    pub fn classify(code: &str) -> KnownCode {
        match code {
            DANGLING_REFERENCE => KnownCode::DanglingReference,
            DUPLICATE_ID => KnownCode::DuplicateId,
            INVALID_ATTRIBUTE => KnownCode::InvalidAttribute,
            _ => KnownCode::Other,
        }
    }
}

const SCXML_REC: &str = "https://www.w3.org/TR/scxml/";

/// Anchor into the SCXML recommendation for a section name.
pub fn spec_ref(anchor: &str) -> String {
    format!("{SCXML_REC}#{anchor}")
}
