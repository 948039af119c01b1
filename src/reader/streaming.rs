//! Streaming XML Event Source
//!
//! Stateful parser that turns a sequence of byte buffers into owned
//! [`XmlEvent`]s with bounded memory.
//!
//! Fed bytes are decoded into an internal text buffer. Only the prefix up to
//! the last *safe boundary* (just after the last complete markup construct)
//! is tokenized; everything after it waits for the next feed. A buffer may
//! therefore end anywhere, including inside a tag, a comment or a multi-byte
//! character, without producing spurious events.

use memchr::{memchr, memmem};

use super::events::XmlEvent;
use crate::core::attributes::parse_attributes;
use crate::core::encoding::{declared_encoding, Charset, StreamDecoder};
use crate::core::tokenizer::{ParseError, TokenKind, Tokenizer};

/// Stateful streaming XML parser
pub struct StreamingParser {
    decoder: StreamDecoder,
    /// Decoded text not yet tokenized
    buffer: String,
    /// Scan position of the boundary finder within `buffer`
    scanned: usize,
    /// Bytes of the unterminated construct at `scanned` already searched
    searched: usize,
    /// End of the last complete markup construct within `buffer`
    boundary: usize,
    /// Offset of `buffer[0]` in the decoded stream
    offset: usize,
    /// Parsed events ready to be consumed
    events: Vec<XmlEvent>,
    /// Recoverable problems ready to be consumed
    errors: Vec<ParseError>,
    declared_encoding: Option<String>,
    finished: bool,
}

impl StreamingParser {
    /// Create a parser decoding its input from `charset`
    pub fn new(charset: Charset) -> Self {
        StreamingParser {
            decoder: StreamDecoder::new(charset),
            buffer: String::with_capacity(8192),
            scanned: 0,
            searched: 0,
            boundary: 0,
            offset: 0,
            events: Vec::with_capacity(64),
            errors: Vec::new(),
            declared_encoding: None,
            finished: false,
        }
    }

    /// Feed a chunk of data to the parser.
    ///
    /// `is_final` marks the last chunk: everything still buffered is
    /// tokenized and unterminated constructs become errors. Feeding after
    /// the final chunk is ignored and reported as an error.
    pub fn feed(&mut self, chunk: &[u8], is_final: bool) {
        if self.finished {
            self.errors.push(ParseError::new(
                "input fed after the final buffer",
                self.offset + self.buffer.len(),
            ));
            return;
        }

        let decoded_from = self.offset + self.buffer.len();
        if let Err(e) = self.decoder.decode(chunk, is_final, &mut self.buffer) {
            self.errors.push(ParseError::new(
                format!("invalid {} byte sequence at source byte {}", self.decoder.charset().label(), e.offset),
                decoded_from,
            ));
        }

        if is_final {
            self.finished = true;
            self.process(self.buffer.len(), true);
        } else {
            self.advance_boundary();
            if self.boundary > 0 {
                self.process(self.boundary, false);
            }
        }
    }

    /// Tokenize `buffer[..end]` and drop what was consumed
    fn process(&mut self, end: usize, is_final: bool) {
        let mut tokenizer = Tokenizer::new(&self.buffer[..end], is_final);

        loop {
            let token = match tokenizer.next_token() {
                Ok(Some(token)) => token,
                Ok(None) => break,
                Err(e) => {
                    self.errors.push(e.rebased(self.offset));
                    continue;
                }
            };

            match token.kind {
                TokenKind::StartTag | TokenKind::EmptyTag => {
                    let Some(name) = token.name else { continue };
                    let attributes = token
                        .content
                        .as_deref()
                        .map(parse_attributes)
                        .unwrap_or_default()
                        .into_iter()
                        .map(|a| (a.name.to_string(), a.value.into_owned()))
                        .collect();
                    self.events.push(XmlEvent::StartTag {
                        name: name.to_string(),
                        attributes,
                    });
                    if token.kind == TokenKind::EmptyTag {
                        self.events.push(XmlEvent::end(name));
                    }
                }
                TokenKind::EndTag => {
                    if let Some(name) = token.name {
                        self.events.push(XmlEvent::end(name));
                    }
                }
                TokenKind::Text | TokenKind::CData => {
                    if let Some(content) = token.content {
                        // Preserve all text including whitespace-only
                        if !content.is_empty() {
                            self.events.push(XmlEvent::Text(content.into_owned()));
                        }
                    }
                }
                TokenKind::XmlDeclaration => {
                    if let Some(label) = token.content.as_deref().and_then(declared_encoding) {
                        self.declared_encoding = Some(label.to_string());
                    }
                }
                TokenKind::Comment | TokenKind::ProcessingInstruction | TokenKind::DocType => {}
            }
        }

        let consumed = tokenizer.unterminated().unwrap_or(end);
        self.buffer.drain(..consumed);
        self.offset += consumed;

        if consumed == self.boundary {
            // Everything before the boundary was complete; keep scanning from there
            self.scanned -= consumed;
        } else {
            self.scanned = 0;
            self.searched = 0;
        }
        self.boundary = 0;
    }

    /// Move `boundary` past every complete markup construct after `scanned`
    fn advance_boundary(&mut self) {
        let buf = self.buffer.as_bytes();
        let mut pos = self.scanned;

        loop {
            let lt = match memchr(b'<', &buf[pos..]) {
                Some(i) => pos + i,
                None => {
                    pos = buf.len();
                    self.searched = 0;
                    break;
                }
            };
            // Resume an open comment, CDATA or PI where the last feed stopped
            let searched = if lt == self.scanned { self.searched } else { 0 };
            match markup_len(&buf[lt..], searched) {
                Some(len) => {
                    pos = lt + len;
                    self.boundary = pos;
                }
                None => {
                    pos = lt;
                    self.searched = buf.len() - lt;
                    break;
                }
            }
        }

        self.scanned = pos;
    }

    /// Take all parsed events
    pub fn take_events(&mut self) -> Vec<XmlEvent> {
        std::mem::take(&mut self.events)
    }

    /// Take all recoverable errors seen so far
    pub fn take_errors(&mut self) -> Vec<ParseError> {
        std::mem::take(&mut self.errors)
    }

    /// Encoding named by the document's XML declaration, once seen
    pub fn declared_encoding(&self) -> Option<&str> {
        self.declared_encoding.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Length of the complete markup construct at the start of `markup` (which
/// begins with '<'), or `None` if it is not complete yet.
///
/// `searched` is how much of `markup` an earlier call already scanned
/// without finding a comment, CDATA or PI terminator.
///
/// Quotes are only tracked inside tags and declarations, so apostrophes in
/// text, comments or CDATA never hide a boundary.
fn markup_len(markup: &[u8], searched: usize) -> Option<usize> {
    const COMMENT: &[u8] = b"<!--";
    const CDATA: &[u8] = b"<![CDATA[";

    if markup.starts_with(COMMENT) {
        return find_terminator(markup, COMMENT.len(), searched, b"-->");
    }
    if markup.starts_with(CDATA) {
        return find_terminator(markup, CDATA.len(), searched, b"]]>");
    }
    if COMMENT.starts_with(markup) || CDATA.starts_with(markup) {
        // Too short to tell which construct this is
        return None;
    }
    if markup.starts_with(b"<?") {
        return find_terminator(markup, 2, searched, b"?>");
    }

    let is_declaration = markup.starts_with(b"<!");
    let mut quote: Option<u8> = None;
    let mut depth = 0usize;
    for (i, &b) in markup.iter().enumerate().skip(1) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'[' if is_declaration => depth += 1,
                b']' if is_declaration => depth = depth.saturating_sub(1),
                b'>' if depth == 0 => return Some(i + 1),
                _ => {}
            },
        }
    }
    None
}

/// End of `close` in `markup`, searching from `open` or from where a
/// terminator split at the previous end could start
fn find_terminator(markup: &[u8], open: usize, searched: usize, close: &[u8]) -> Option<usize> {
    let from = open.max(searched.saturating_sub(close.len() - 1)).min(markup.len());
    memmem::find(&markup[from..], close).map(|i| from + i + close.len())
}
