//! Owned structural events.

use docset_diagnostics::SourceLocation;

/// One structural event of a markup document.
///
/// Text, comments and doctype declarations keep their escaped source form
/// so they are written back byte-for-byte.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlEvent {
    /// `<?xml version="1.0" ...?>`
    Declaration(Declaration),

    /// `<?target data?>`
    ProcessingInstruction { target: String, data: String },

    /// Content of `<!DOCTYPE ...>` after the keyword.
    DocType(String),

    /// Content of `<!-- ... -->`.
    Comment(String),

    /// An element start tag, or a self-closing element.
    Start(StartTag),

    /// An element end tag. Not produced for self-closing elements.
    End { name: String },

    /// Character data, still escaped.
    Text(String),

    /// Content of a CDATA section.
    CData(String),
}

impl XmlEvent {
    /// Build a processing instruction event.
    pub fn processing_instruction(target: impl Into<String>, data: impl Into<String>) -> Self {
        XmlEvent::ProcessingInstruction {
            target: target.into(),
            data: data.into(),
        }
    }
}

/// The XML declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

/// An attribute with its value unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Qualified name as written (`xml:lang`, `href`).
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An element start tag.
#[derive(Debug, Clone, PartialEq)]
pub struct StartTag {
    /// Qualified name as written (`ditaarch:topic`, `xref`).
    pub name: String,

    /// Attributes in source order.
    pub attributes: Vec<Attribute>,

    /// `true` for `<x/>`: no matching [`XmlEvent::End`] follows.
    pub self_closing: bool,

    /// Position of the `<` that opened the tag.
    pub location: SourceLocation,
}

impl StartTag {
    pub fn new(name: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            self_closing: false,
            location,
        }
    }

    /// Name without namespace prefix.
    pub fn local_name(&self) -> &str {
        self.name.split(':').next_back().unwrap_or(&self.name)
    }

    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    /// Replace the value of an attribute in place, or append it.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value,
            None => self.attributes.push(Attribute::new(name, value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str) -> StartTag {
        StartTag::new(name, SourceLocation::anonymous(1, 1))
    }

    #[test]
    fn test_local_name() {
        assert_eq!(tag("topic").local_name(), "topic");
        assert_eq!(tag("ditaarch:topic").local_name(), "topic");
    }

    #[test]
    fn test_set_attribute_keeps_position() {
        let mut t = tag("xref");
        t.set_attribute("href", "a.dita");
        t.set_attribute("scope", "local");
        t.set_attribute("href", "b.dita");

        let names: Vec<&str> = t.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["href", "scope"]);
        assert_eq!(t.get_attribute("href"), Some("b.dita"));
    }
}
