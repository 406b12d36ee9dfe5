use crate::error::ParseError;
use roxmltree::Document;

/// Parse XML text into a read-only tree with source positions.
///
/// Performs well-formedness checking only. DTDs are rejected.
pub fn parse(input: &str) -> Result<Document<'_>, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError {
            message: "empty input".to_string(),
            line: 0,
            column: 0,
        });
    }

    Document::parse(input).map_err(|e| {
        let pos = e.pos();
        ParseError {
            message: e.to_string(),
            line: pos.row as usize,
            column: pos.col as usize,
        }
    })
}
