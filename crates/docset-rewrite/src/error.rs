/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Error types for the reference rewriting stage.
 */

use std::path::PathBuf;

use docset_diagnostics::{DiagnosticKind, DiagnosticMessage, DiagnosticMessageBuilder, SourceLocation};
use thiserror::Error;

/// A reference value that could not be turned into a path or URI.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed reference `{reference}`: {reason}")]
pub struct MalformedReference {
    pub reference: String,
    pub reason: String,
}

impl MalformedReference {
    pub fn new(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while rewriting a document set.
///
/// Attribute-level problems ([`RewriteError::MalformedReference`],
/// [`RewriteError::UnresolvedKey`]) are reported as warnings and the
/// document carries on. Everything else abandons the document it occurred in.
#[derive(Debug, Clone, Error)]
pub enum RewriteError {
    #[error("{source} in attribute `{attribute}`")]
    MalformedReference {
        #[source]
        source: MalformedReference,
        attribute: String,
        location: Option<SourceLocation>,
    },

    #[error("key `{key}` is not defined")]
    UnresolvedKey {
        key: String,
        location: Option<SourceLocation>,
    },

    #[error("reference `{reference}` resolves to {} outside the map directory", target.display())]
    OuterBoundaryViolation {
        reference: String,
        target: PathBuf,
        location: Option<SourceLocation>,
    },

    #[error("cannot compute the {directive} directive for {}: {reason}", document.display())]
    MissingDirective {
        directive: &'static str,
        document: PathBuf,
        reason: String,
    },

    #[error(transparent)]
    Xml(#[from] docset_xml::Error),

    #[error("I/O error on {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    #[error("invalid job configuration: {0}")]
    Config(String),
}

/// Result type alias for rewriting operations.
pub type Result<T> = std::result::Result<T, RewriteError>;

impl RewriteError {
    pub fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        RewriteError::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Whether this error abandons the document it occurred in.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            RewriteError::MalformedReference { .. } | RewriteError::UnresolvedKey { .. }
        )
    }

    /// Convert to a diagnostic, as an error for fatal problems and a warning otherwise.
    pub fn to_diagnostic(&self) -> DiagnosticMessage {
        let kind = if self.is_fatal() {
            DiagnosticKind::Error
        } else {
            DiagnosticKind::Warning
        };
        self.to_diagnostic_as(kind)
    }

    /// Convert to a diagnostic of the given kind.
    pub fn to_diagnostic_as(&self, kind: DiagnosticKind) -> DiagnosticMessage {
        match self {
            RewriteError::MalformedReference {
                source,
                attribute,
                location,
            } => DiagnosticMessageBuilder::from_code(kind, "D-2-1")
                .problem(format!(
                    "The `{}` value `{}` could not be parsed",
                    attribute, source.reference
                ))
                .add_detail(source.reason.clone())
                .add_note("The attribute was left unchanged")
                .with_optional_location(location.clone())
                .build(),

            RewriteError::UnresolvedKey { key, location } => {
                DiagnosticMessageBuilder::from_code(kind, "D-2-2")
                    .problem(format!("No map defines the key `{}`", key))
                    .add_hint("Is the key defined in a map reachable from the input map?")
                    .with_optional_location(location.clone())
                    .build()
            }

            RewriteError::OuterBoundaryViolation {
                reference,
                target,
                location,
            } => DiagnosticMessageBuilder::from_code(kind, "D-2-3")
                .problem(format!(
                    "`{}` points to {}, above the input map directory",
                    reference,
                    target.display()
                ))
                .add_hint("Set generate-copy-outer to keep files outside the map directory?")
                .with_optional_location(location.clone())
                .build(),

            RewriteError::MissingDirective {
                directive,
                document,
                reason,
            } => DiagnosticMessageBuilder::from_code(kind, "D-2-4")
                .problem(format!(
                    "Cannot compute `{}` for {}",
                    directive,
                    document.display()
                ))
                .add_detail(reason.clone())
                .build(),

            RewriteError::Xml(err) => {
                let mut diagnostic = err.to_diagnostic();
                diagnostic.kind = kind;
                diagnostic
            }

            RewriteError::Io { path, message } => DiagnosticMessageBuilder::from_code(kind, "D-2-5")
                .problem(format!("Cannot access {}", path.display()))
                .add_detail(message.clone())
                .build(),

            RewriteError::Config(message) => DiagnosticMessageBuilder::from_code(kind, "D-3-1")
                .problem(message.clone())
                .build(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_errors_are_warnings() {
        let err = RewriteError::UnresolvedKey {
            key: "missing".to_string(),
            location: Some(SourceLocation::new("/src/a.dita", 3, 5)),
        };
        assert!(!err.is_fatal());

        let diag = err.to_diagnostic();
        assert_eq!(diag.kind, DiagnosticKind::Warning);
        assert_eq!(diag.code.as_deref(), Some("D-2-2"));
        assert_eq!(diag.title, "Unresolved Key Reference");
    }

    #[test]
    fn test_boundary_violation_kind_follows_caller() {
        let err = RewriteError::OuterBoundaryViolation {
            reference: "../x.dita".to_string(),
            target: PathBuf::from("/x.dita"),
            location: None,
        };
        assert!(err.is_fatal());
        assert_eq!(err.to_diagnostic().kind, DiagnosticKind::Error);
        assert_eq!(
            err.to_diagnostic_as(DiagnosticKind::Warning).kind,
            DiagnosticKind::Warning
        );
    }

    #[test]
    fn test_malformed_reference_message() {
        let err = RewriteError::MalformedReference {
            source: MalformedReference::new("file://host/a.dita", "remote host"),
            attribute: "href".to_string(),
            location: None,
        };
        assert_eq!(
            err.to_string(),
            "malformed reference `file://host/a.dita`: remote host in attribute `href`"
        );
        assert_eq!(err.to_diagnostic().code.as_deref(), Some("D-2-1"));
    }

    #[test]
    fn test_xml_error_keeps_its_code() {
        let err = RewriteError::from(docset_xml::Error::UnexpectedEof {
            expected: "closing tag </topic>".to_string(),
            location: None,
        });
        assert_eq!(err.to_diagnostic().code.as_deref(), Some("D-1-2"));
    }
}
