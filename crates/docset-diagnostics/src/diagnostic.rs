//! Core diagnostic message types.
//!
//! Messages follow the tidyverse structure: a short title, a problem
//! statement, bulleted details and optional hints that end with `?`.

use serde::{Deserialize, Serialize};

use crate::location::SourceLocation;

/// The kind of diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// An error that prevents the current document from being written
    Error,
    /// A problem that was recovered from locally
    Warning,
    /// Informational message
    Info,
    /// A note providing additional context
    Note,
}

impl DiagnosticKind {
    fn label(&self) -> &'static str {
        match self {
            DiagnosticKind::Error => "Error",
            DiagnosticKind::Warning => "Warning",
            DiagnosticKind::Info => "Info",
            DiagnosticKind::Note => "Note",
        }
    }

    fn json_name(&self) -> &'static str {
        match self {
            DiagnosticKind::Error => "error",
            DiagnosticKind::Warning => "warning",
            DiagnosticKind::Info => "info",
            DiagnosticKind::Note => "note",
        }
    }
}

/// How detail items should be presented (tidyverse x/i bullet style).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetailKind {
    /// Error detail (✖ bullet)
    Error,
    /// Info detail (ℹ bullet)
    Info,
    /// Note detail (plain bullet)
    Note,
}

impl DetailKind {
    fn bullet(&self) -> &'static str {
        match self {
            DetailKind::Error => "✖",
            DetailKind::Info => "ℹ",
            DetailKind::Note => "•",
        }
    }

    fn json_name(&self) -> &'static str {
        match self {
            DetailKind::Error => "error",
            DetailKind::Info => "info",
            DetailKind::Note => "note",
        }
    }
}

/// The content of a message or detail item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageContent {
    /// Plain text content
    Plain(String),
    /// Markdown content (backticks mark paths, keys and attribute names)
    Markdown(String),
}

impl MessageContent {
    /// Get the raw string content for display
    pub fn as_str(&self) -> &str {
        match self {
            MessageContent::Plain(s) => s,
            MessageContent::Markdown(s) => s,
        }
    }

    /// Convert to JSON value with type information
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::json;
        match self {
            MessageContent::Plain(s) => json!({
                "type": "plain",
                "content": s
            }),
            MessageContent::Markdown(s) => json!({
                "type": "markdown",
                "content": s
            }),
        }
    }
}

impl From<String> for MessageContent {
    fn from(s: String) -> Self {
        MessageContent::Markdown(s)
    }
}

impl From<&str> for MessageContent {
    fn from(s: &str) -> Self {
        MessageContent::Markdown(s.to_string())
    }
}

/// A detail item in a diagnostic message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailItem {
    /// The kind of detail (error, info, note)
    pub kind: DetailKind,
    /// The content of the detail
    pub content: MessageContent,
}

/// A diagnostic message following tidyverse-style structure.
///
/// Structure:
/// 1. **Code**: Optional error code (e.g., "D-2-1") from the catalog
/// 2. **Title**: Brief error message
/// 3. **Kind**: Error, Warning, Info, Note
/// 4. **Problem**: What went wrong
/// 5. **Details**: Specific information (bulleted)
/// 6. **Hints**: Optional guidance for fixing (ends with ?)
/// 7. **Location**: Where in which document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticMessage {
    /// Optional error code (e.g., "D-2-1")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Brief title for the error
    pub title: String,

    /// The kind of diagnostic
    pub kind: DiagnosticKind,

    /// The problem statement
    pub problem: Option<MessageContent>,

    /// Specific error details
    pub details: Vec<DetailItem>,

    /// Optional hints for fixing (ends with ?)
    pub hints: Vec<MessageContent>,

    /// Source location for this diagnostic
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

impl DiagnosticMessage {
    /// Create a new diagnostic message with just a title and kind.
    ///
    /// Prefer [`DiagnosticMessageBuilder`](crate::DiagnosticMessageBuilder)
    /// for anything with a problem statement or details.
    pub fn new(kind: DiagnosticKind, title: impl Into<String>) -> Self {
        Self {
            code: None,
            title: title.into(),
            kind,
            problem: None,
            details: Vec::new(),
            hints: Vec::new(),
            location: None,
        }
    }

    /// Create an error diagnostic.
    pub fn error(title: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Error, title)
    }

    /// Create a warning diagnostic.
    pub fn warning(title: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Warning, title)
    }

    /// Create an info diagnostic.
    pub fn info(title: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Info, title)
    }

    /// Set the error code.
    ///
    /// ```
    /// use docset_diagnostics::DiagnosticMessage;
    ///
    /// let msg = DiagnosticMessage::error("XML Syntax Error").with_code("D-1-1");
    /// assert_eq!(msg.code.as_deref(), Some("D-1-1"));
    /// ```
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Set the source location.
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn is_error(&self) -> bool {
        self.kind == DiagnosticKind::Error
    }

    /// Render this diagnostic message as text following tidyverse style.
    ///
    /// Format:
    /// ```text
    /// Warning [D-2-2]: title
    ///   at /path/to/file.dita:3:5
    /// Problem statement here
    /// ✖ Error detail
    /// ℹ Info detail
    /// • Note detail
    /// ? Hint
    /// ```
    pub fn to_text(&self) -> String {
        let mut lines = Vec::new();

        match &self.code {
            Some(code) => lines.push(format!("{} [{}]: {}", self.kind.label(), code, self.title)),
            None => lines.push(format!("{}: {}", self.kind.label(), self.title)),
        }

        if let Some(location) = &self.location {
            lines.push(format!("  at {}", location));
        }

        if let Some(problem) = &self.problem {
            lines.push(problem.as_str().to_string());
        }

        for detail in &self.details {
            lines.push(format!("{} {}", detail.kind.bullet(), detail.content.as_str()));
        }

        for hint in &self.hints {
            lines.push(format!("? {}", hint.as_str()));
        }

        lines.join("\n")
    }

    /// Render this diagnostic message as a JSON value.
    ///
    /// ```
    /// use docset_diagnostics::DiagnosticMessage;
    ///
    /// let msg = DiagnosticMessage::warning("Something looks off");
    /// let json = msg.to_json();
    /// assert_eq!(json["kind"], "warning");
    /// assert_eq!(json["title"], "Something looks off");
    /// ```
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::json;

        let mut obj = json!({
            "kind": self.kind.json_name(),
            "title": self.title,
        });

        if let Some(code) = &self.code {
            obj["code"] = json!(code);
        }

        if let Some(problem) = &self.problem {
            obj["problem"] = problem.to_json();
        }

        if !self.details.is_empty() {
            let details: Vec<_> = self
                .details
                .iter()
                .map(|d| {
                    json!({
                        "kind": d.kind.json_name(),
                        "content": d.content.to_json()
                    })
                })
                .collect();
            obj["details"] = json!(details);
        }

        if !self.hints.is_empty() {
            let hints: Vec<_> = self.hints.iter().map(|h| h.to_json()).collect();
            obj["hints"] = json!(hints);
        }

        if let Some(location) = &self.location {
            obj["location"] = json!(location);
        }

        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::DiagnosticMessageBuilder;

    #[test]
    fn test_diagnostic_message_new() {
        let msg = DiagnosticMessage::new(DiagnosticKind::Error, "Test error");
        assert_eq!(msg.title, "Test error");
        assert_eq!(msg.kind, DiagnosticKind::Error);
        assert!(msg.code.is_none());
        assert!(msg.problem.is_none());
        assert!(msg.details.is_empty());
        assert!(msg.hints.is_empty());
        assert!(msg.location.is_none());
    }

    #[test]
    fn test_diagnostic_message_constructors() {
        assert_eq!(DiagnosticMessage::error("e").kind, DiagnosticKind::Error);
        assert_eq!(DiagnosticMessage::warning("w").kind, DiagnosticKind::Warning);
        assert_eq!(DiagnosticMessage::info("i").kind, DiagnosticKind::Info);
        assert!(DiagnosticMessage::error("e").is_error());
        assert!(!DiagnosticMessage::warning("w").is_error());
    }

    #[test]
    fn test_to_text_simple_error() {
        let msg = DiagnosticMessage::error("Something went wrong");
        assert_eq!(msg.to_text(), "Error: Something went wrong");
    }

    #[test]
    fn test_to_text_with_code() {
        let msg = DiagnosticMessage::error("Something went wrong").with_code("D-1-1");
        assert_eq!(msg.to_text(), "Error [D-1-1]: Something went wrong");
    }

    #[test]
    fn test_to_text_full_message() {
        let msg = DiagnosticMessageBuilder::warning("Malformed Reference")
            .with_code("D-2-1")
            .with_location(SourceLocation::new("/src/a.dita", 3, 5))
            .problem("Attribute `href` could not be parsed")
            .add_detail("Value is `file://host/share/a.dita`")
            .add_info("The attribute was left unrewritten")
            .add_hint("Use a path relative to the current document?")
            .build();

        insta::assert_snapshot!(msg.to_text(), @r"
        Warning [D-2-1]: Malformed Reference
          at /src/a.dita:3:5
        Attribute `href` could not be parsed
        ✖ Value is `file://host/share/a.dita`
        ℹ The attribute was left unrewritten
        ? Use a path relative to the current document?
        ");
    }

    #[test]
    fn test_to_json_full_message() {
        let msg = DiagnosticMessageBuilder::error("Missing Document Directive")
            .with_code("D-2-4")
            .problem("No path from the document back to the map")
            .add_detail("Document is `/other/a.dita`")
            .add_hint("Place the document under the source root?")
            .with_location(SourceLocation::anonymous(1, 1))
            .build();

        let json = msg.to_json();
        assert_eq!(json["kind"], "error");
        assert_eq!(json["code"], "D-2-4");
        assert_eq!(json["problem"]["type"], "markdown");
        assert_eq!(
            json["problem"]["content"],
            "No path from the document back to the map"
        );
        assert_eq!(json["details"][0]["kind"], "error");
        assert_eq!(json["details"][0]["content"]["content"], "Document is `/other/a.dita`");
        assert_eq!(json["hints"][0]["content"], "Place the document under the source root?");
        assert_eq!(json["location"]["line"], 1);
        assert!(json["location"].get("file").is_none());
    }

    #[test]
    fn test_to_json_omits_empty_fields() {
        let json = DiagnosticMessage::warning("Be careful").to_json();
        assert_eq!(json["kind"], "warning");
        assert!(json.get("code").is_none());
        assert!(json.get("problem").is_none());
        assert!(json.get("details").is_none());
        assert!(json.get("hints").is_none());
        assert!(json.get("location").is_none());
    }
}
