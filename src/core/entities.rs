//! XML Entity Decoding and Escaping
//!
//! Decoding handles the predefined entities (`&lt;` `&gt;` `&amp;` `&quot;`
//! `&apos;`), numeric character references and a few common HTML entities
//! found in real-world feeds. Unknown entities are kept verbatim.
//!
//! Escaping is the reverse direction used when item markup is rebuilt for
//! output. Both sides use Cow so the common entity-free case never allocates.

use memchr::{memchr, memchr3};
use std::borrow::Cow;

/// Decode entity references in text or attribute content
#[inline]
pub fn decode_text(input: &str) -> Cow<'_, str> {
    if memchr(b'&', input.as_bytes()).is_none() {
        return Cow::Borrowed(input);
    }
    Cow::Owned(decode_entities(input))
}

fn decode_entities(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut result = String::with_capacity(input.len());
    let mut pos = 0;

    while let Some(amp) = memchr(b'&', &bytes[pos..]) {
        let amp = pos + amp;
        result.push_str(&input[pos..amp]);

        // Entity names are short; a far-away ';' belongs to something else
        let semi = memchr(b';', &bytes[amp..]).filter(|&offset| offset <= 32);
        match semi.and_then(|offset| decode_entity(&input[amp + 1..amp + offset]).map(|c| (offset, c))) {
            Some((offset, decoded)) => {
                result.push(decoded);
                pos = amp + offset + 1;
            }
            None => {
                result.push('&');
                pos = amp + 1;
            }
        }
    }
    result.push_str(&input[pos..]);
    result
}

/// Decode a single entity body (without `&` and `;`)
fn decode_entity(entity: &str) -> Option<char> {
    if let Some(numeric) = entity.strip_prefix('#') {
        return decode_numeric_entity(numeric);
    }

    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{00A0}'),
        "copy" => Some('\u{00A9}'),
        "reg" => Some('\u{00AE}'),
        "trade" => Some('\u{2122}'),
        "mdash" => Some('\u{2014}'),
        "ndash" => Some('\u{2013}'),
        "hellip" => Some('\u{2026}'),
        _ => None,
    }
}

fn decode_numeric_entity(entity: &str) -> Option<char> {
    let codepoint = match entity.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => entity.parse::<u32>().ok()?,
    };
    if !is_valid_xml_char(codepoint) {
        return None;
    }
    char::from_u32(codepoint)
}

/// Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
#[inline]
pub fn is_valid_xml_char(codepoint: u32) -> bool {
    matches!(codepoint,
        0x9 | 0xA | 0xD |
        0x20..=0xD7FF |
        0xE000..=0xFFFD |
        0x10000..=0x10FFFF
    )
}

/// Escape character data for element content.
///
/// Only `&`, `<` and `>` are escaped so rebuilt markup stays as close to the
/// source as possible.
pub fn escape_text(input: &str) -> Cow<'_, str> {
    if memchr3(b'&', b'<', b'>', input.as_bytes()).is_none() {
        return Cow::Borrowed(input);
    }

    let mut result = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }
    Cow::Owned(result)
}

/// Escape an attribute value for a double-quoted attribute
pub fn escape_attribute(input: &str) -> Cow<'_, str> {
    if !input.bytes().any(|b| matches!(b, b'&' | b'<' | b'"' | b'\n' | b'\r' | b'\t')) {
        return Cow::Borrowed(input);
    }

    let mut result = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '"' => result.push_str("&quot;"),
            '\n' => result.push_str("&#10;"),
            '\r' => result.push_str("&#13;"),
            '\t' => result.push_str("&#9;"),
            _ => result.push(c),
        }
    }
    Cow::Owned(result)
}
