//! Event serialization over quick-xml.

use std::io::Write;

use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};

use crate::Result;
use crate::event::{StartTag, XmlEvent};

/// Writes [`XmlEvent`]s back out as markup.
///
/// Attribute values are escaped on output; text, comments and doctype
/// content are written exactly as read.
pub struct EventWriter<W: Write> {
    writer: Writer<W>,
}

impl<W: Write> EventWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: Writer::new(inner),
        }
    }

    pub fn write(&mut self, event: &XmlEvent) -> Result<()> {
        match event {
            XmlEvent::Declaration(decl) => {
                self.writer.write_event(Event::Decl(BytesDecl::new(
                    &decl.version,
                    decl.encoding.as_deref(),
                    decl.standalone.as_deref(),
                )))?;
            }
            XmlEvent::ProcessingInstruction { target, data } => {
                let content = if data.is_empty() {
                    target.clone()
                } else {
                    format!("{} {}", target, data)
                };
                self.writer.write_event(Event::PI(BytesPI::new(content)))?;
            }
            XmlEvent::DocType(content) => {
                self.writer
                    .write_event(Event::DocType(BytesText::from_escaped(content.as_str())))?;
            }
            XmlEvent::Comment(content) => {
                self.writer
                    .write_event(Event::Comment(BytesText::from_escaped(content.as_str())))?;
            }
            XmlEvent::Start(tag) => {
                let start = start_event(tag);
                if tag.self_closing {
                    self.writer.write_event(Event::Empty(start))?;
                } else {
                    self.writer.write_event(Event::Start(start))?;
                }
            }
            XmlEvent::End { name } => {
                self.writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
            }
            XmlEvent::Text(content) => {
                self.writer
                    .write_event(Event::Text(BytesText::from_escaped(content.as_str())))?;
            }
            XmlEvent::CData(content) => {
                self.writer
                    .write_event(Event::CData(BytesCData::new(content.as_str())))?;
            }
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

fn start_event(tag: &StartTag) -> BytesStart<'_> {
    let mut start = BytesStart::new(tag.name.as_str());
    for attr in &tag.attributes {
        start.push_attribute((attr.name.as_str(), attr.value.as_str()));
    }
    start
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventReader;

    fn round_trip(source: &str) -> String {
        let mut writer = EventWriter::new(Vec::new());
        for event in EventReader::new(source) {
            writer.write(&event.unwrap()).unwrap();
        }
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn test_round_trip_preserves_structure() {
        let source = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE map PUBLIC \"-//OASIS//DTD DITA Map//EN\" \"map.dtd\">\n<map>\n  <!-- intro -->\n  <topicref href=\"a.dita\"/>\n  <title>A &amp; B</title>\n  <data><![CDATA[x < y]]></data>\n</map>";
        assert_eq!(round_trip(source), source);
    }

    #[test]
    fn test_rewritten_attributes_are_requoted() {
        let source = "<map>\n  <topicref href='a b.dita' format=\"dita\"/>\n  <topicref href='c.dita'>\n    <topicmeta/>\n  </topicref>\n</map>";
        let mut writer = EventWriter::new(Vec::new());
        for event in EventReader::new(source) {
            let mut event = event.unwrap();
            if let XmlEvent::Start(tag) = &mut event
                && tag.get_attribute("href") == Some("a b.dita")
            {
                tag.set_attribute("href", "a%20b.dita");
            }
            writer.write(&event).unwrap();
        }

        insta::assert_snapshot!(String::from_utf8(writer.into_inner()).unwrap(), @r#"
        <map>
          <topicref href="a%20b.dita" format="dita"/>
          <topicref href="c.dita">
            <topicmeta/>
          </topicref>
        </map>
        "#);
    }

    #[test]
    fn test_attribute_values_are_escaped() {
        let mut writer = EventWriter::new(Vec::new());
        let mut tag = StartTag::new("xref", docset_diagnostics::SourceLocation::anonymous(1, 1));
        tag.self_closing = true;
        tag.set_attribute("href", "a.dita?x=1&y=\"2\"");
        writer.write(&XmlEvent::Start(tag)).unwrap();

        let output = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(output, "<xref href=\"a.dita?x=1&amp;y=&quot;2&quot;\"/>");
    }

    #[test]
    fn test_processing_instructions() {
        let mut writer = EventWriter::new(Vec::new());
        writer
            .write(&XmlEvent::processing_instruction("path2project", ""))
            .unwrap();
        writer
            .write(&XmlEvent::processing_instruction("workdir", "/out/topics"))
            .unwrap();

        let output = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(output, "<?path2project?><?workdir /out/topics?>");
    }
}
