//! XML Attribute Parsing
//!
//! Lenient parsing of the attribute list of a start tag. Values have their
//! entities decoded; malformed pieces are skipped rather than rejected.

use super::entities::decode_text;
use super::scanner::{is_name_char, is_name_start_char};
use std::borrow::Cow;

/// A parsed XML attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'a> {
    /// Attribute name (may include namespace prefix)
    pub name: &'a str,
    /// Attribute value (entities decoded)
    pub value: Cow<'a, str>,
}

impl<'a> Attribute<'a> {
    pub fn new(name: &'a str, value: Cow<'a, str>) -> Self {
        Attribute { name, value }
    }
}

/// `xmlns` or `xmlns:p`
pub fn is_namespace_declaration(name: &str) -> bool {
    name == "xmlns" || name.starts_with("xmlns:")
}

/// Parse attributes from raw tag content (after the element name)
///
/// Input is the content between the element name and '>' or '/>'.
pub fn parse_attributes(input: &str) -> Vec<Attribute<'_>> {
    let bytes = input.as_bytes();
    let mut attrs = Vec::new();
    let mut pos = 0;

    loop {
        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }
        if pos >= bytes.len() || bytes[pos] == b'/' || bytes[pos] == b'>' {
            break;
        }

        let name_start = pos;
        if !is_name_start_char(bytes[pos]) {
            pos += 1;
            continue;
        }
        while pos < bytes.len() && is_name_char(bytes[pos]) {
            pos += 1;
        }
        let name = &input[name_start..pos];

        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }
        if pos >= bytes.len() || bytes[pos] != b'=' {
            // Attribute without value (HTML-style boolean attribute)
            attrs.push(Attribute::new(name, Cow::Borrowed("")));
            continue;
        }
        pos += 1;

        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }
        if pos >= bytes.len() {
            attrs.push(Attribute::new(name, Cow::Borrowed("")));
            break;
        }

        let quote = bytes[pos];
        if quote != b'"' && quote != b'\'' {
            // Unquoted value (non-standard but handle it)
            let value_start = pos;
            while pos < bytes.len() && !is_whitespace(bytes[pos]) && bytes[pos] != b'/' && bytes[pos] != b'>' {
                pos += 1;
            }
            attrs.push(Attribute::new(name, decode_text(&input[value_start..pos])));
            continue;
        }

        pos += 1;
        let value_start = pos;
        while pos < bytes.len() && bytes[pos] != quote {
            pos += 1;
        }
        attrs.push(Attribute::new(name, decode_text(&input[value_start..pos])));
        if pos < bytes.len() {
            pos += 1;
        }
    }

    attrs
}

#[inline]
fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_attributes() {
        let attrs = parse_attributes(" id=\"test\" class=\"foo\"");
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].name, "id");
        assert_eq!(attrs[0].value, "test");
        assert_eq!(attrs[1].name, "class");
        assert_eq!(attrs[1].value, "foo");
    }

    #[test]
    fn test_single_quoted() {
        let attrs = parse_attributes(" id='te\"st'");
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].value, "te\"st");
    }

    #[test]
    fn test_namespace_declarations() {
        let attrs = parse_attributes(" xmlns=\"urn:a\" xmlns:g=\"urn:g\" g:id=\"1\"");
        assert_eq!(attrs.len(), 3);
        assert!(is_namespace_declaration(attrs[0].name));
        assert!(is_namespace_declaration(attrs[1].name));
        assert!(!is_namespace_declaration(attrs[2].name));
        assert!(!is_namespace_declaration("xmlnsfoo"));
    }

    #[test]
    fn test_entity_in_value() {
        let attrs = parse_attributes(" title=\"&lt;hello&gt;\"");
        assert_eq!(attrs[0].value, "<hello>");
    }

    #[test]
    fn test_empty_and_boolean() {
        assert!(parse_attributes("").is_empty());
        let attrs = parse_attributes(" checked id=\"1\"");
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].name, "checked");
        assert_eq!(attrs[0].value, "");
    }

    #[test]
    fn test_whitespace_handling() {
        let attrs = parse_attributes("  id  =  \"test\"  ");
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].name, "id");
        assert_eq!(attrs[0].value, "test");
    }
}
