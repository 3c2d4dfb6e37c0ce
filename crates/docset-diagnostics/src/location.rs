//! Source positions attached to diagnostics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in a source document.
///
/// Lines and columns are 1-based, the way editors display them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Path of the document, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: Some(file.into()),
            line,
            column,
        }
    }

    /// A position with no associated file, e.g. inside an in-memory buffer.
    pub fn anonymous(line: usize, column: usize) -> Self {
        Self {
            file: None,
            line,
            column,
        }
    }

    /// Attach a file path to a location produced by a reader that didn't know it.
    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}:{}", file, self.line, self.column),
            None => write!(f, "{}:{}", self.line, self.column),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_file() {
        let loc = SourceLocation::new("topics/a.dita", 3, 7);
        assert_eq!(loc.to_string(), "topics/a.dita:3:7");
    }

    #[test]
    fn test_display_anonymous() {
        assert_eq!(SourceLocation::anonymous(1, 1).to_string(), "1:1");
        assert_eq!(
            SourceLocation::anonymous(2, 5).in_file("x.dita").to_string(),
            "x.dita:2:5"
        );
    }
}
