//! Character Encoding Handling
//!
//! The tokenizer always works on UTF-8. Source bytes are decoded from the
//! configured charset as they are fed, and chunk payloads are encoded back
//! into it when written. Single-byte charsets cannot represent every
//! character, so those are written as numeric character references.

use std::borrow::Cow;
use std::fmt::Write as _;

/// Supported source/output charsets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    /// ISO-8859-1: every byte maps to the code point of the same value
    Latin1,
    UsAscii,
}

/// Bytes that are not valid in the configured charset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    /// Offset of the first invalid byte in the source stream
    pub offset: usize,
}

impl Charset {
    /// Resolve a charset label such as `UTF-8` or `iso-8859-1` (case-insensitive)
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(Charset::Utf8),
            "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" | "l1" => Some(Charset::Latin1),
            "us-ascii" | "ascii" => Some(Charset::UsAscii),
            _ => None,
        }
    }

    /// Canonical lowercase label
    pub fn label(&self) -> &'static str {
        match self {
            Charset::Utf8 => "utf-8",
            Charset::Latin1 => "iso-8859-1",
            Charset::UsAscii => "us-ascii",
        }
    }

    /// Whether a label from an XML declaration names this charset
    pub fn matches_label(&self, label: &str) -> bool {
        Charset::from_label(label) == Some(*self)
    }

    /// Encode UTF-8 text into this charset
    pub fn encode<'a>(&self, text: &'a str) -> Cow<'a, [u8]> {
        let limit = match self {
            Charset::Utf8 => return Cow::Borrowed(text.as_bytes()),
            Charset::Latin1 => 0xFF,
            Charset::UsAscii => 0x7F,
        };

        if text.is_ascii() {
            return Cow::Borrowed(text.as_bytes());
        }

        let mut out = Vec::with_capacity(text.len());
        let mut reference = String::new();
        for c in text.chars() {
            let code = c as u32;
            if code <= limit {
                out.push(code as u8);
            } else {
                reference.clear();
                // Writing to a String cannot fail
                let _ = write!(reference, "&#{};", code);
                out.extend_from_slice(reference.as_bytes());
            }
        }
        Cow::Owned(out)
    }
}

/// Incremental decoder from the source charset to UTF-8.
///
/// A multi-byte UTF-8 sequence split across two feeds is held back until the
/// rest of it arrives, so decoded text never contains a spurious replacement
/// character at a buffer boundary. A leading byte order mark is dropped.
pub struct StreamDecoder {
    charset: Charset,
    pending: Vec<u8>,
    consumed: usize,
    at_start: bool,
}

impl StreamDecoder {
    pub fn new(charset: Charset) -> Self {
        StreamDecoder {
            charset,
            pending: Vec::new(),
            consumed: 0,
            at_start: true,
        }
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// Decode `chunk` onto the end of `out`.
    ///
    /// Invalid bytes are replaced with U+FFFD and decoding carries on; the
    /// error reports the first one seen in this call.
    pub fn decode(&mut self, chunk: &[u8], is_final: bool, out: &mut String) -> Result<(), DecodeError> {
        let start_len = out.len();
        let result = match self.charset {
            Charset::Latin1 => {
                out.extend(chunk.iter().map(|&b| b as char));
                self.consumed += chunk.len();
                Ok(())
            }
            Charset::UsAscii => self.decode_ascii(chunk, out),
            Charset::Utf8 => self.decode_utf8(chunk, is_final, out),
        };

        if self.at_start && out.len() > start_len {
            self.at_start = false;
            if out[start_len..].starts_with('\u{FEFF}') {
                out.replace_range(start_len..start_len + '\u{FEFF}'.len_utf8(), "");
            }
        }
        result
    }

    fn decode_ascii(&mut self, chunk: &[u8], out: &mut String) -> Result<(), DecodeError> {
        let mut first_error = None;
        for (i, &b) in chunk.iter().enumerate() {
            if b.is_ascii() {
                out.push(b as char);
            } else {
                out.push(char::REPLACEMENT_CHARACTER);
                first_error.get_or_insert(DecodeError { offset: self.consumed + i });
            }
        }
        self.consumed += chunk.len();
        first_error.map_or(Ok(()), Err)
    }

    fn decode_utf8(&mut self, chunk: &[u8], is_final: bool, out: &mut String) -> Result<(), DecodeError> {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);
        let base = self.consumed;
        let mut first_error = None;
        let mut pos = 0;
        let mut decoded_end = bytes.len();

        while pos < bytes.len() {
            let e = match std::str::from_utf8(&bytes[pos..]) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => e,
            };

            let valid_end = pos + e.valid_up_to();
            if let Ok(valid) = std::str::from_utf8(&bytes[pos..valid_end]) {
                out.push_str(valid);
            }
            match e.error_len() {
                // Split sequence: wait for the rest of it
                None if !is_final => {
                    self.pending = bytes[valid_end..].to_vec();
                    decoded_end = valid_end;
                    break;
                }
                None => {
                    out.push(char::REPLACEMENT_CHARACTER);
                    first_error.get_or_insert(DecodeError { offset: base + valid_end });
                    break;
                }
                Some(len) => {
                    out.push(char::REPLACEMENT_CHARACTER);
                    first_error.get_or_insert(DecodeError { offset: base + valid_end });
                    pos = valid_end + len;
                }
            }
        }

        self.consumed = base + decoded_end;
        first_error.map_or(Ok(()), Err)
    }
}

/// Extract the `encoding` pseudo-attribute from an XML declaration body
/// (the text between `<?xml` and `?>`)
pub fn declared_encoding(declaration: &str) -> Option<&str> {
    let start = declaration.find("encoding")? + "encoding".len();
    let rest = declaration[start..].trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let body = &rest[1..];
    body.find(quote).map(|end| &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(charset: Charset, chunks: &[&[u8]]) -> (String, Vec<DecodeError>) {
        let mut decoder = StreamDecoder::new(charset);
        let mut out = String::new();
        let mut errors = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if let Err(e) = decoder.decode(chunk, i + 1 == chunks.len(), &mut out) {
                errors.push(e);
            }
        }
        (out, errors)
    }

    #[test]
    fn test_from_label() {
        assert_eq!(Charset::from_label("UTF-8"), Some(Charset::Utf8));
        assert_eq!(Charset::from_label(" iso-8859-1 "), Some(Charset::Latin1));
        assert_eq!(Charset::from_label("ASCII"), Some(Charset::UsAscii));
        assert_eq!(Charset::from_label("UTF-16"), None);
        assert!(Charset::Latin1.matches_label("ISO-8859-1"));
        assert!(!Charset::Utf8.matches_label("ISO-8859-1"));
    }

    #[test]
    fn test_utf8_split_sequence() {
        let bytes = "Fürdő".as_bytes();
        // Split inside the two-byte 'ü'
        let (out, errors) = decode_all(Charset::Utf8, &[&bytes[..2], &bytes[2..]]);
        assert_eq!(out, "Fürdő");
        assert!(errors.is_empty());
    }

    #[test]
    fn test_utf8_invalid_byte() {
        let (out, errors) = decode_all(Charset::Utf8, &[&b"ab"[..], &[0xFF, b'c'][..]]);
        assert_eq!(out, "ab\u{FFFD}c");
        assert_eq!(errors, vec![DecodeError { offset: 2 }]);
    }

    #[test]
    fn test_utf8_truncated_at_end() {
        let (out, errors) = decode_all(Charset::Utf8, &[&b"a"[..], &[0xC3][..]]);
        assert_eq!(out, "a\u{FFFD}");
        assert_eq!(errors, vec![DecodeError { offset: 1 }]);
    }

    #[test]
    fn test_bom_stripped_when_split() {
        let (out, _) = decode_all(Charset::Utf8, &[&[0xEF, 0xBB][..], &[0xBF, b'<', b'a', b'/', b'>'][..]]);
        assert_eq!(out, "<a/>");
    }

    #[test]
    fn test_decode_latin1() {
        let (out, errors) = decode_all(Charset::Latin1, &[&[b'F', 0xFC, b'r'][..]]);
        assert_eq!(out, "Für");
        assert!(errors.is_empty());
    }

    #[test]
    fn test_decode_ascii_rejects_high_bytes() {
        let (out, errors) = decode_all(Charset::UsAscii, &[&b"ok"[..], &[0xE9][..]]);
        assert_eq!(out, "ok\u{FFFD}");
        assert_eq!(errors, vec![DecodeError { offset: 2 }]);
    }

    #[test]
    fn test_encode_latin1() {
        assert_eq!(Charset::Latin1.encode("Für").as_ref(), &[b'F', 0xFC, b'r']);
        assert_eq!(Charset::Latin1.encode("ő").as_ref(), b"&#337;");
    }

    #[test]
    fn test_encode_utf8_passthrough() {
        assert!(matches!(Charset::Utf8.encode("Fürdő"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_declared_encoding() {
        assert_eq!(declared_encoding(r#"version="1.0" encoding="ISO-8859-1""#), Some("ISO-8859-1"));
        assert_eq!(declared_encoding("version='1.0' encoding = 'utf-8' standalone='yes'"), Some("utf-8"));
        assert_eq!(declared_encoding(r#"version="1.0""#), None);
    }
}
