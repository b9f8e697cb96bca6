//! Line decoding for delimited catalog exports
//!
//! Decoding never fails: whatever the split produces is handed on, and the
//! validator decides whether the shape is usable.

use crate::models::{DecodedFields, LineKind};

/// Split a raw line on `delimiter`, keeping empty and trailing fields.
///
/// A line without the delimiter yields a single field; an empty line yields
/// one empty field.
pub fn decode(line: &str, delimiter: char) -> DecodedFields {
    line.split(delimiter).map(str::to_string).collect()
}

/// Classify a line by its zero-based position in the file
pub fn classify(line_index: usize) -> LineKind {
    if line_index == 0 {
        LineKind::Header
    } else {
        LineKind::Data
    }
}
