//! Builder API for diagnostic messages.
//!
//! The builder encodes the tidyverse guidelines: one problem statement,
//! bulleted details, hints phrased as questions.

use crate::catalog::get_error_info;
use crate::diagnostic::{
    DetailItem, DetailKind, DiagnosticKind, DiagnosticMessage, MessageContent,
};
use crate::location::SourceLocation;

/// Builder for [`DiagnosticMessage`].
///
/// # Example
///
/// ```
/// use docset_diagnostics::DiagnosticMessageBuilder;
///
/// let msg = DiagnosticMessageBuilder::error("Reference Outside Map Directory")
///     .with_code("D-2-3")
///     .problem("`../shared/a.dita` resolves above the map directory")
///     .add_hint("Enable copying of outer files?")
///     .build();
///
/// assert_eq!(msg.hints.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct DiagnosticMessageBuilder {
    message: DiagnosticMessage,
}

impl DiagnosticMessageBuilder {
    fn new(kind: DiagnosticKind, title: impl Into<String>) -> Self {
        Self {
            message: DiagnosticMessage::new(kind, title),
        }
    }

    pub fn error(title: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Error, title)
    }

    pub fn warning(title: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Warning, title)
    }

    pub fn info(title: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Info, title)
    }

    /// Start a message whose title comes from the error catalog.
    ///
    /// Unknown codes fall back to the code itself as the title.
    ///
    /// ```
    /// use docset_diagnostics::{DiagnosticKind, DiagnosticMessageBuilder};
    ///
    /// let msg = DiagnosticMessageBuilder::from_code(DiagnosticKind::Warning, "D-2-2").build();
    /// assert_eq!(msg.title, "Unresolved Key Reference");
    /// assert_eq!(msg.code.as_deref(), Some("D-2-2"));
    /// ```
    pub fn from_code(kind: DiagnosticKind, code: &str) -> Self {
        let title = get_error_info(code)
            .map(|info| info.title.clone())
            .unwrap_or_else(|| code.to_string());
        Self::new(kind, title).with_code(code)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.message.code = Some(code.into());
        self
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.message.location = Some(location);
        self
    }

    /// Attach a location only if one is available.
    pub fn with_optional_location(mut self, location: Option<SourceLocation>) -> Self {
        if location.is_some() {
            self.message.location = location;
        }
        self
    }

    /// Set the problem statement (what went wrong).
    pub fn problem(mut self, problem: impl Into<MessageContent>) -> Self {
        self.message.problem = Some(problem.into());
        self
    }

    /// Add an error detail (✖).
    pub fn add_detail(self, detail: impl Into<MessageContent>) -> Self {
        self.push_detail(DetailKind::Error, detail)
    }

    /// Add an info detail (ℹ).
    pub fn add_info(self, detail: impl Into<MessageContent>) -> Self {
        self.push_detail(DetailKind::Info, detail)
    }

    /// Add a note detail (•).
    pub fn add_note(self, detail: impl Into<MessageContent>) -> Self {
        self.push_detail(DetailKind::Note, detail)
    }

    /// Add a hint. Hints should end with a question mark.
    pub fn add_hint(mut self, hint: impl Into<MessageContent>) -> Self {
        self.message.hints.push(hint.into());
        self
    }

    fn push_detail(mut self, kind: DetailKind, content: impl Into<MessageContent>) -> Self {
        self.message.details.push(DetailItem {
            kind,
            content: content.into(),
        });
        self
    }

    pub fn build(self) -> DiagnosticMessage {
        self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_parts_in_order() {
        let msg = DiagnosticMessageBuilder::warning("Title")
            .problem("Problem")
            .add_detail("first")
            .add_info("second")
            .add_note("third")
            .add_hint("Fix it?")
            .build();

        assert_eq!(msg.kind, DiagnosticKind::Warning);
        assert_eq!(msg.problem.as_ref().map(|p| p.as_str()), Some("Problem"));
        let kinds: Vec<DetailKind> = msg.details.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DetailKind::Error, DetailKind::Info, DetailKind::Note]);
        assert_eq!(msg.hints[0].as_str(), "Fix it?");
    }

    #[test]
    fn test_from_unknown_code_uses_code_as_title() {
        let msg = DiagnosticMessageBuilder::from_code(DiagnosticKind::Error, "D-42-42").build();
        assert_eq!(msg.title, "D-42-42");
    }

    #[test]
    fn test_optional_location() {
        let without = DiagnosticMessageBuilder::info("x")
            .with_optional_location(None)
            .build();
        assert!(without.location.is_none());

        let with = DiagnosticMessageBuilder::info("x")
            .with_optional_location(Some(SourceLocation::anonymous(2, 3)))
            .build();
        assert_eq!(with.location, Some(SourceLocation::anonymous(2, 3)));
    }
}
