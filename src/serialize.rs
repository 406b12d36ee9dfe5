//! [`ValidationResult`] → JSON report.

use crate::error::{SerializeError, ValidationResult};

/// Serialize a result as pretty-printed JSON.
///
/// The top-level object has a single `diagnostics` array. Optional fields
/// (`attribute`, `spec_ref`, `hints`, `related`) are omitted when empty.
pub fn serialize(result: &ValidationResult) -> Result<String, SerializeError> {
    serde_json::to_string_pretty(result).map_err(|e| SerializeError {
        message: format!("failed to serialize diagnostics to JSON: {}", e),
    })
}

/// Read a JSON report back into a result.
pub fn deserialize(json: &str) -> Result<ValidationResult, SerializeError> {
    serde_json::from_str(json).map_err(|e| SerializeError {
        message: format!("failed to parse JSON report: {}", e),
    })
}
