//! Byte offset to line/column conversion.

use docset_diagnostics::SourceLocation;

/// Index of line start offsets for a source text.
///
/// Built once per document so every event position is a binary search
/// rather than a rescan from the beginning.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self { line_starts }
    }

    /// 1-based line and column (in characters) of a byte offset.
    ///
    /// Offsets past the end clamp to the end of the source.
    pub fn location(&self, source: &str, offset: usize) -> SourceLocation {
        let offset = offset.min(source.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line];
        let column = source
            .get(line_start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(offset - line_start);
        SourceLocation::anonymous(line + 1, column + 1)
    }
}
