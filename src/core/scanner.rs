//! SIMD-accelerated delimiter scanning using memchr
//!
//! The scanner walks a single decoded region of the stream. Positions are
//! byte offsets into that region; the streaming layer translates them into
//! stream offsets when it reports errors.

use memchr::{memchr, memchr3, memmem};

/// Cursor over one region of XML input
pub struct Scanner<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    #[inline]
    pub fn new(input: &'a [u8]) -> Self {
        Scanner { input, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.input.len());
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.input.len()
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    #[inline]
    pub fn remaining(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    /// Skip XML whitespace (space, tab, newline, carriage return)
    #[inline]
    pub fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek() {
            self.pos += 1;
        }
    }

    #[inline]
    pub fn starts_with(&self, needle: &[u8]) -> bool {
        self.input[self.pos..].starts_with(needle)
    }

    /// Find next '<' (tag start)
    #[inline]
    pub fn find_tag_start(&self) -> Option<usize> {
        memchr(b'<', self.remaining()).map(|i| self.pos + i)
    }

    /// Find next occurrence of a single byte
    #[inline]
    pub fn find_byte(&self, byte: u8) -> Option<usize> {
        memchr(byte, self.remaining()).map(|i| self.pos + i)
    }

    /// Find next occurrence of a terminator such as `-->` or `]]>`
    #[inline]
    pub fn find_sequence(&self, needle: &[u8]) -> Option<usize> {
        memmem::find(self.remaining(), needle).map(|i| self.pos + i)
    }

    /// Find the '>' closing the current tag, skipping '>' inside quoted
    /// attribute values.
    pub fn find_tag_end_quoted(&self) -> Option<usize> {
        let mut pos = self.pos;
        let mut quote: Option<u8> = None;

        while pos < self.input.len() {
            match quote {
                Some(q) => {
                    let offset = memchr(q, &self.input[pos..])?;
                    pos += offset + 1;
                    quote = None;
                }
                None => {
                    let offset = memchr3(b'>', b'"', b'\'', &self.input[pos..])?;
                    let at = pos + offset;
                    match self.input[at] {
                        b'>' => return Some(at),
                        q => quote = Some(q),
                    }
                    pos = at + 1;
                }
            }
        }
        None
    }

    /// Read an XML name and advance past it
    pub fn read_name(&mut self) -> Option<&'a [u8]> {
        let start = self.pos;
        if !self.peek().is_some_and(is_name_start_char) {
            return None;
        }
        self.pos += 1;
        while self.peek().is_some_and(is_name_char) {
            self.pos += 1;
        }
        Some(&self.input[start..self.pos])
    }
}

/// Name start characters: ASCII letters, underscore, colon, and any non-ASCII
/// UTF-8 byte
#[inline]
pub(crate) fn is_name_start_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

#[inline]
pub(crate) fn is_name_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' | b'.' | b':') || b >= 0x80
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_runs_to_next_tag() {
        let scanner = Scanner::new(b"Kad 180 cm<shopItem>");
        assert_eq!(scanner.find_tag_start(), Some(10));
        assert_eq!(Scanner::new(b"no markup").find_tag_start(), None);
    }

    #[test]
    fn test_tag_end_skips_quoted_gt() {
        let scanner = Scanner::new(br#"<price note="a > b">12</price>"#);
        assert_eq!(scanner.find_tag_end_quoted(), Some(19));

        let scanner = Scanner::new(b"<a x='it\"s>'>");
        assert_eq!(scanner.find_tag_end_quoted(), Some(12));
    }

    #[test]
    fn test_tag_end_inside_open_quote() {
        let scanner = Scanner::new(b"<name lang=\"hu>");
        assert_eq!(scanner.find_tag_end_quoted(), None);
    }

    #[test]
    fn test_find_sequence() {
        let scanner = Scanner::new(b"<!-- a > b -->rest");
        assert_eq!(scanner.find_sequence(b"-->"), Some(11));
    }

    #[test]
    fn test_read_prefixed_name() {
        let mut scanner = Scanner::new(b"g:weight_kg.v2>");
        assert_eq!(scanner.read_name(), Some(&b"g:weight_kg.v2"[..]));
        assert_eq!(scanner.peek(), Some(b'>'));
    }

    #[test]
    fn test_read_name_rejects_digit_start() {
        let mut scanner = Scanner::new(b"1abc");
        assert_eq!(scanner.read_name(), None);
        assert_eq!(scanner.position(), 0);
    }

    #[test]
    fn test_set_position_clamps() {
        let mut scanner = Scanner::new(b"\n\t <a/>");
        scanner.skip_whitespace();
        assert_eq!(scanner.position(), 3);
        scanner.set_position(100);
        assert!(scanner.is_eof());
    }
}
