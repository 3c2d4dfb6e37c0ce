//! Streaming XML events for the docset rewriting stage.
//!
//! This crate wraps `quick-xml` to expose a document as a flat sequence of
//! owned structural events ([`XmlEvent`]) that can be inspected, modified and
//! written back out. Every start tag remembers where it began in the source
//! (1-based line and column) so rewriting code can report precise locations
//! and stamp elements with their origin.
//!
//! Text, comments and doctype declarations are kept in their escaped source
//! form and written back unchanged. Start tags are re-serialized from their
//! parsed attributes, so attribute quoting is normalized to double quotes.
//!
//! # Example
//!
//! ```rust
//! use docset_xml::{EventReader, EventWriter, XmlEvent};
//!
//! let source = r#"<topic id="t"><xref href="a.dita"/></topic>"#;
//! let mut writer = EventWriter::new(Vec::new());
//!
//! for event in EventReader::new(source) {
//!     let mut event = event.unwrap();
//!     if let XmlEvent::Start(tag) = &mut event {
//!         if tag.local_name() == "xref" {
//!             tag.set_attribute("href", "b.dita");
//!         }
//!     }
//!     writer.write(&event).unwrap();
//! }
//!
//! let output = String::from_utf8(writer.into_inner()).unwrap();
//! assert_eq!(output, r#"<topic id="t"><xref href="b.dita"/></topic>"#);
//! ```

pub mod error;
pub mod event;
pub mod lines;
pub mod reader;
pub mod writer;

pub use docset_diagnostics::SourceLocation;
pub use error::{Error, Result};
pub use event::{Attribute, Declaration, StartTag, XmlEvent};
pub use lines::LineIndex;
pub use reader::EventReader;
pub use writer::EventWriter;
