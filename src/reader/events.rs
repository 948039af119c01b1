//! XML Event Types
//!
//! Owned events produced by the streaming event source. Owning the data lets
//! the source drop its input buffer as soon as a region is tokenized.

use crate::core::entities::{escape_attribute, escape_text};

/// XML parsing event
///
/// Empty-element tags arrive as a `StartTag` immediately followed by the
/// matching `EndTag`; CDATA sections arrive as `Text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEvent {
    /// Start of an element: <name attrs...>
    StartTag {
        name: String,
        /// (name, decoded value) in document order
        attributes: Vec<(String, String)>,
    },
    /// End of an element: </name>
    EndTag { name: String },
    /// Decoded character data
    Text(String),
}

impl XmlEvent {
    /// Start tag without attributes
    pub fn start(name: impl Into<String>) -> Self {
        XmlEvent::StartTag {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    pub fn end(name: impl Into<String>) -> Self {
        XmlEvent::EndTag { name: name.into() }
    }

    pub fn text(content: impl Into<String>) -> Self {
        XmlEvent::Text(content.into())
    }

    /// Append this event as XML markup, re-escaping text and attribute values
    pub fn write_markup(&self, out: &mut String) {
        match self {
            XmlEvent::StartTag { name, attributes } => {
                out.push('<');
                out.push_str(name);
                for (attr, value) in attributes {
                    out.push(' ');
                    out.push_str(attr);
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(value));
                    out.push('"');
                }
                out.push('>');
            }
            XmlEvent::EndTag { name } => {
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
            XmlEvent::Text(content) => out.push_str(&escape_text(content)),
        }
    }
}
