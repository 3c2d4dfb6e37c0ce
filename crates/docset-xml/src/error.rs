//! Error types for reading and writing markup events.

use docset_diagnostics::{DiagnosticMessage, DiagnosticMessageBuilder, SourceLocation};
use thiserror::Error;

/// Result type alias for docset-xml operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while streaming a document.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// XML syntax error from quick-xml.
    #[error("XML syntax error: {message}")]
    XmlSyntax {
        message: String,
        location: Option<SourceLocation>,
    },

    /// The input ended while elements were still open.
    #[error("Unexpected end of input, expected {expected}")]
    UnexpectedEof {
        expected: String,
        location: Option<SourceLocation>,
    },

    /// An end tag that doesn't close the innermost open element.
    #[error("Mismatched end tag: expected </{expected}>, found </{found}>")]
    MismatchedEndTag {
        expected: String,
        found: String,
        location: Option<SourceLocation>,
    },

    /// An attribute that could not be parsed or unescaped.
    #[error("Invalid attribute: {message}")]
    InvalidAttribute {
        message: String,
        location: Option<SourceLocation>,
    },

    /// Failure writing serialized events.
    #[error("Failed to write XML output: {0}")]
    Write(String),
}

impl Error {
    /// Location of the problem, if known.
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            Error::XmlSyntax { location, .. }
            | Error::UnexpectedEof { location, .. }
            | Error::MismatchedEndTag { location, .. }
            | Error::InvalidAttribute { location, .. } => location.as_ref(),
            Error::Write(_) => None,
        }
    }

    /// Same error with the document path filled into its location.
    pub fn in_file(self, file: &str) -> Self {
        let attach = |location: Option<SourceLocation>| location.map(|l| l.in_file(file));
        match self {
            Error::XmlSyntax { message, location } => Error::XmlSyntax {
                message,
                location: attach(location),
            },
            Error::UnexpectedEof { expected, location } => Error::UnexpectedEof {
                expected,
                location: attach(location),
            },
            Error::MismatchedEndTag {
                expected,
                found,
                location,
            } => Error::MismatchedEndTag {
                expected,
                found,
                location: attach(location),
            },
            Error::InvalidAttribute { message, location } => Error::InvalidAttribute {
                message,
                location: attach(location),
            },
            Error::Write(message) => Error::Write(message),
        }
    }

    /// Convert this error to a DiagnosticMessage with the matching D-1-* code.
    pub fn to_diagnostic(&self) -> DiagnosticMessage {
        match self {
            Error::XmlSyntax { message, location } => {
                DiagnosticMessageBuilder::error("XML Syntax Error")
                    .with_code("D-1-1")
                    .problem(message.clone())
                    .with_optional_location(location.clone())
                    .build()
            }

            Error::UnexpectedEof { expected, location } => {
                DiagnosticMessageBuilder::error("Unexpected End of XML Input")
                    .with_code("D-1-2")
                    .problem(format!(
                        "The document ended unexpectedly; expected {}",
                        expected
                    ))
                    .with_optional_location(location.clone())
                    .build()
            }

            Error::MismatchedEndTag {
                expected,
                found,
                location,
            } => DiagnosticMessageBuilder::error("Mismatched XML End Tag")
                .with_code("D-1-3")
                .problem(format!(
                    "End tag </{}> does not match start tag <{}>",
                    found, expected
                ))
                .add_detail(format!("Expected: </{}>", expected))
                .add_detail(format!("Found: </{}>", found))
                .add_hint("Check that all opening tags have matching closing tags?")
                .with_optional_location(location.clone())
                .build(),

            Error::InvalidAttribute { message, location } => {
                DiagnosticMessageBuilder::error("Invalid Attribute")
                    .with_code("D-1-4")
                    .problem(message.clone())
                    .with_optional_location(location.clone())
                    .build()
            }

            Error::Write(message) => DiagnosticMessageBuilder::error("Document I/O Failure")
                .with_code("D-2-5")
                .problem(message.clone())
                .build(),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::XmlSyntax {
            message: err.to_string(),
            location: None,
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::InvalidAttribute {
            message: err.to_string(),
            location: None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Write(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatched_end_tag_diagnostic() {
        let err = Error::MismatchedEndTag {
            expected: "topic".to_string(),
            found: "concept".to_string(),
            location: Some(SourceLocation::anonymous(4, 1)),
        };
        let diag = err.in_file("/src/a.dita").to_diagnostic();

        assert_eq!(diag.code.as_deref(), Some("D-1-3"));
        assert_eq!(diag.details.len(), 2);
        assert_eq!(
            diag.location,
            Some(SourceLocation::new("/src/a.dita", 4, 1))
        );
    }

    #[test]
    fn test_write_error_has_no_location() {
        let err = Error::from(std::io::Error::other("disk full"));
        assert!(err.location().is_none());
        assert_eq!(err.to_diagnostic().code.as_deref(), Some("D-2-5"));
    }
}
