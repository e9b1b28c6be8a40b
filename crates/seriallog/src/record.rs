//! The record data model.
//!
//! A [`Record`] is a validated, fixed-arity tuple of text fields derived
//! from one input line. Lines whose shape does not match are rejected,
//! never errored.

use serde::{Deserialize, Serialize};

/// A validated row of text fields parsed from one serial input line.
///
/// Fields are stored verbatim after trimming; no numeric validation is
/// performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    fields: Vec<String>,
}

impl Record {
    /// Parse one input line into a record.
    ///
    /// The line is trimmed of surrounding whitespace and split on
    /// `delimiter`. It is accepted only if the split yields exactly
    /// `expected_fields` tokens; each token is then trimmed individually.
    /// Returns `None` for empty lines and lines with any other field
    /// count.
    #[must_use]
    pub fn parse(line: &str, delimiter: char, expected_fields: usize) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let tokens: Vec<&str> = line.split(delimiter).collect();
        if tokens.len() != expected_fields {
            return None;
        }

        Some(Self {
            fields: tokens.iter().map(|token| token.trim().to_string()).collect(),
        })
    }

    /// The fields of this record, in input order.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// The number of fields in this record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether this record has no fields.
    ///
    /// Never true for a record produced by [`Record::parse`] with a
    /// positive expected field count.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
