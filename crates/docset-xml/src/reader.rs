//! Pull-based event reader over quick-xml.

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};

use crate::event::{Attribute, Declaration, StartTag, XmlEvent};
use crate::lines::LineIndex;
use crate::{Error, Result};

/// Reads a document as a sequence of [`XmlEvent`]s.
///
/// The reader checks nesting itself so mismatched or unclosed elements are
/// reported with the position of the offending start tag.
///
/// # Example
///
/// ```rust
/// use docset_xml::{EventReader, XmlEvent};
///
/// let events: Vec<XmlEvent> = EventReader::new("<map><topicref href='a.dita'/></map>")
///     .collect::<Result<_, _>>()
///     .unwrap();
///
/// assert_eq!(events.len(), 3);
/// match &events[1] {
///     XmlEvent::Start(tag) => {
///         assert_eq!(tag.name, "topicref");
///         assert!(tag.self_closing);
///         assert_eq!(tag.get_attribute("href"), Some("a.dita"));
///     }
///     other => panic!("unexpected event {:?}", other),
/// }
/// ```
pub struct EventReader<'a> {
    /// The source content being read.
    source: &'a str,

    /// The quick-xml reader.
    reader: Reader<&'a [u8]>,

    lines: LineIndex,

    /// Open elements with the location of their start tag.
    open: Vec<(String, docset_diagnostics::SourceLocation)>,

    finished: bool,
}

impl<'a> EventReader<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut reader = Reader::from_str(source);
        let config = reader.config_mut();
        config.trim_text_start = false;
        config.trim_text_end = false;
        config.check_end_names = false;

        Self {
            source,
            reader,
            lines: LineIndex::new(source),
            open: Vec::new(),
            finished: false,
        }
    }

    /// Read the next event, or `None` at the end of a well-formed document.
    pub fn next_event(&mut self) -> Result<Option<XmlEvent>> {
        if self.finished {
            return Ok(None);
        }

        // Capture position before reading the event
        let event_start = self.reader.buffer_position() as usize;

        let event = match self.reader.read_event() {
            Ok(event) => event,
            Err(e) => {
                self.finished = true;
                let position = self.reader.error_position() as usize;
                return Err(Error::XmlSyntax {
                    message: e.to_string(),
                    location: Some(self.lines.location(self.source, position)),
                });
            }
        };

        let converted = match event {
            Event::Start(e) => {
                let tag = self.start_tag(&e, event_start, false)?;
                self.open.push((tag.name.clone(), tag.location.clone()));
                XmlEvent::Start(tag)
            }
            Event::Empty(e) => XmlEvent::Start(self.start_tag(&e, event_start, true)?),
            Event::End(e) => self.end_tag(&e, event_start)?,
            Event::Text(e) => XmlEvent::Text(lossy(&e)),
            Event::CData(e) => XmlEvent::CData(lossy(&e)),
            Event::Comment(e) => XmlEvent::Comment(lossy(&e)),
            Event::DocType(e) => XmlEvent::DocType(lossy(&e)),
            Event::PI(e) => XmlEvent::ProcessingInstruction {
                target: String::from_utf8_lossy(e.target()).into_owned(),
                data: String::from_utf8_lossy(e.content()).trim_start().to_string(),
            },
            Event::Decl(e) => XmlEvent::Declaration(declaration(&e)?),
            Event::Eof => {
                self.finished = true;
                if let Some((name, location)) = self.open.pop() {
                    return Err(Error::UnexpectedEof {
                        expected: format!("closing tag </{}>", name),
                        location: Some(location),
                    });
                }
                return Ok(None);
            }
        };

        Ok(Some(converted))
    }

    fn start_tag(&self, e: &BytesStart<'_>, event_start: usize, self_closing: bool) -> Result<StartTag> {
        let location = self.lines.location(self.source, event_start);
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();

        let mut attributes = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|err| Error::InvalidAttribute {
                message: err.to_string(),
                location: Some(location.clone()),
            })?;
            let value = attr.unescape_value().map_err(|err| Error::InvalidAttribute {
                message: format!("Invalid attribute value: {}", err),
                location: Some(location.clone()),
            })?;
            attributes.push(Attribute {
                name: String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                value: value.into_owned(),
            });
        }

        Ok(StartTag {
            name,
            attributes,
            self_closing,
            location,
        })
    }

    fn end_tag(&mut self, e: &BytesEnd<'_>, event_start: usize) -> Result<XmlEvent> {
        let found = String::from_utf8_lossy(e.name().as_ref()).into_owned();

        let (expected, location) = self.open.pop().ok_or_else(|| Error::XmlSyntax {
            message: format!("Unexpected closing tag </{}>", found),
            location: Some(self.lines.location(self.source, event_start)),
        })?;

        if expected != found {
            return Err(Error::MismatchedEndTag {
                expected,
                found,
                location: Some(location),
            });
        }

        Ok(XmlEvent::End { name: found })
    }
}

impl Iterator for EventReader<'_> {
    type Item = Result<XmlEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_event() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => None,
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn declaration(e: &BytesDecl<'_>) -> Result<Declaration> {
    let to_string = |bytes: Cow<'_, [u8]>| String::from_utf8_lossy(&bytes).into_owned();

    let version = to_string(e.version()?);
    let encoding = e.encoding().transpose()?.map(to_string);
    let standalone = e.standalone().transpose()?.map(to_string);

    Ok(Declaration {
        version,
        encoding,
        standalone,
    })
}
