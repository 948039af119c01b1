//! XML Tokenizer - lenient pull tokenizer over one decoded region
//!
//! Extracts element start/end tags, text, CDATA sections, comments,
//! processing instructions, the XML declaration and DOCTYPE.
//!
//! The tokenizer is built for streaming: a region handed to it may end in the
//! middle of a construct. In a non-final region such a construct is not an
//! error; the tokenizer stops and [`Tokenizer::unterminated`] reports where it
//! began so the caller can carry those bytes over to the next region. Malformed
//! markup is reported as a [`ParseError`] and skipped up to the next `>`.

use super::entities::decode_text;
use super::scanner::Scanner;
use std::borrow::Cow;

/// Type of XML token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Element start tag: <element>
    StartTag,
    /// Element end tag: </element>
    EndTag,
    /// Empty element: <element/>
    EmptyTag,
    /// Text content
    Text,
    /// CDATA section: <![CDATA[...]]>
    CData,
    /// Comment: <!--...-->
    Comment,
    /// Processing instruction: <?target ...?>
    ProcessingInstruction,
    /// XML declaration: <?xml ...?>
    XmlDeclaration,
    /// DOCTYPE declaration
    DocType,
}

/// A parsed XML token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Raw span in the region (start, end)
    pub span: (usize, usize),
    /// Element name for tags, target for processing instructions
    pub name: Option<&'a str>,
    /// Decoded text for `Text`, raw content for CDATA/comments/PIs/
    /// declarations, and the raw attribute list for start and empty tags
    pub content: Option<Cow<'a, str>>,
}

impl<'a> Token<'a> {
    fn new(kind: TokenKind, span: (usize, usize)) -> Self {
        Token {
            kind,
            span,
            name: None,
            content: None,
        }
    }

    fn with_name(mut self, name: &'a str) -> Self {
        self.name = Some(name);
        self
    }

    fn with_content(mut self, content: Cow<'a, str>) -> Self {
        self.content = Some(content);
        self
    }
}

/// Malformed input at a given byte offset
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at byte {position}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        ParseError {
            message: message.into(),
            position,
        }
    }

    /// Shift the position by `base`, turning a region offset into a stream offset
    pub fn rebased(mut self, base: usize) -> Self {
        self.position += base;
        self
    }
}

/// Lenient XML tokenizer over a single region
pub struct Tokenizer<'a> {
    input: &'a str,
    scanner: Scanner<'a>,
    is_final: bool,
    unterminated: Option<usize>,
}

impl<'a> Tokenizer<'a> {
    /// Create a tokenizer. `is_final` marks the last region of the stream;
    /// only then are unterminated constructs errors.
    pub fn new(input: &'a str, is_final: bool) -> Self {
        Tokenizer {
            input,
            scanner: Scanner::new(input.as_bytes()),
            is_final,
            unterminated: None,
        }
    }

    /// Start of a construct that ran past the end of a non-final region
    pub fn unterminated(&self) -> Option<usize> {
        self.unterminated
    }

    /// Get the next token.
    ///
    /// `Ok(None)` means the region is exhausted or an unterminated construct
    /// was reached. After an `Err` the tokenizer has already skipped the bad
    /// markup and can be called again.
    pub fn next_token(&mut self) -> Result<Option<Token<'a>>, ParseError> {
        if self.unterminated.is_some() || self.scanner.is_eof() {
            return Ok(None);
        }

        match self.scanner.peek() {
            Some(b'<') => self.parse_markup(),
            _ => self.parse_text(),
        }
    }

    /// Text runs until the next '<'
    fn parse_text(&mut self) -> Result<Option<Token<'a>>, ParseError> {
        let start = self.scanner.position();
        let end = match self.scanner.find_tag_start() {
            Some(end) => end,
            None if self.is_final => self.scanner.len(),
            None => return self.incomplete(start, "text"),
        };
        self.scanner.set_position(end);

        let raw = &self.input[start..end];
        Ok(Some(Token::new(TokenKind::Text, (start, end)).with_content(decode_text(raw))))
    }

    fn parse_markup(&mut self) -> Result<Option<Token<'a>>, ParseError> {
        let start = self.scanner.position();
        self.scanner.advance(1); // Skip '<'

        match self.scanner.peek() {
            Some(b'/') => self.parse_end_tag(start),
            Some(b'!') => self.parse_bang_markup(start),
            Some(b'?') => self.parse_pi(start),
            Some(_) => self.parse_start_tag(start),
            None => self.incomplete(start, "markup"),
        }
    }

    fn parse_start_tag(&mut self, start: usize) -> Result<Option<Token<'a>>, ParseError> {
        let name = match self.read_name() {
            Some(name) => name,
            None => return self.malformed(start, "invalid element name"),
        };
        let name_end = self.scanner.position();

        let end = match self.scanner.find_tag_end_quoted() {
            Some(end) => end,
            None => return self.incomplete(start, "start tag"),
        };

        let is_empty = end > name_end && self.input.as_bytes()[end - 1] == b'/';
        let attrs_end = if is_empty { end - 1 } else { end };
        self.scanner.set_position(end + 1);

        let kind = if is_empty { TokenKind::EmptyTag } else { TokenKind::StartTag };
        Ok(Some(
            Token::new(kind, (start, end + 1))
                .with_name(name)
                .with_content(Cow::Borrowed(&self.input[name_end..attrs_end])),
        ))
    }

    fn parse_end_tag(&mut self, start: usize) -> Result<Option<Token<'a>>, ParseError> {
        self.scanner.advance(1); // Skip '/'

        let name = match self.read_name() {
            Some(name) => name,
            None if self.scanner.is_eof() => return self.incomplete(start, "end tag"),
            None => return self.malformed(start, "invalid element name in end tag"),
        };

        let end = match self.scanner.find_byte(b'>') {
            Some(end) => end,
            None => return self.incomplete(start, "end tag"),
        };

        self.scanner.skip_whitespace();
        if self.scanner.position() != end {
            return self.malformed(start, "end tag cannot have attributes");
        }

        self.scanner.set_position(end + 1);
        Ok(Some(Token::new(TokenKind::EndTag, (start, end + 1)).with_name(name)))
    }

    /// Comment, CDATA or DOCTYPE
    fn parse_bang_markup(&mut self, start: usize) -> Result<Option<Token<'a>>, ParseError> {
        self.scanner.advance(1); // Skip '!'

        if self.scanner.starts_with(b"--") {
            self.scanner.advance(2);
            return self.parse_delimited(start, b"-->", TokenKind::Comment);
        }
        if self.scanner.starts_with(b"[CDATA[") {
            self.scanner.advance(7);
            return self.parse_delimited(start, b"]]>", TokenKind::CData);
        }
        if self.scanner.starts_with(b"DOCTYPE") {
            return self.parse_doctype(start);
        }

        // Not enough bytes yet to tell which construct this is
        const KEYWORDS: [&[u8]; 3] = [b"--", b"[CDATA[", b"DOCTYPE"];
        let rest = self.scanner.remaining();
        let could_continue = KEYWORDS.iter().any(|keyword| keyword.starts_with(rest));
        if could_continue {
            return self.incomplete(start, "declaration");
        }

        self.malformed(start, "invalid declaration, expected comment, CDATA or DOCTYPE")
    }

    /// A construct whose body ends at a fixed terminator
    fn parse_delimited(
        &mut self,
        start: usize,
        terminator: &[u8],
        kind: TokenKind,
    ) -> Result<Option<Token<'a>>, ParseError> {
        let content_start = self.scanner.position();
        let end = match self.scanner.find_sequence(terminator) {
            Some(end) => end,
            None => return self.incomplete(start, "section"),
        };
        self.scanner.set_position(end + terminator.len());

        let content = &self.input[content_start..end];
        Ok(Some(
            Token::new(kind, (start, self.scanner.position())).with_content(Cow::Borrowed(content)),
        ))
    }

    /// DOCTYPE, including an internal subset in brackets
    fn parse_doctype(&mut self, start: usize) -> Result<Option<Token<'a>>, ParseError> {
        self.scanner.advance(7); // Skip "DOCTYPE"
        let content_start = self.scanner.position();
        let bytes = self.input.as_bytes();

        let mut depth = 0usize;
        let mut quote: Option<u8> = None;
        let mut pos = content_start;
        while pos < bytes.len() {
            let b = bytes[pos];
            match quote {
                Some(q) if b == q => quote = None,
                Some(_) => {}
                None => match b {
                    b'"' | b'\'' => quote = Some(b),
                    b'[' => depth += 1,
                    b']' => depth = depth.saturating_sub(1),
                    b'>' if depth == 0 => {
                        self.scanner.set_position(pos + 1);
                        let content = self.input[content_start..pos].trim();
                        return Ok(Some(
                            Token::new(TokenKind::DocType, (start, pos + 1))
                                .with_content(Cow::Borrowed(content)),
                        ));
                    }
                    _ => {}
                },
            }
            pos += 1;
        }

        self.incomplete(start, "DOCTYPE")
    }

    /// Processing instruction or XML declaration
    fn parse_pi(&mut self, start: usize) -> Result<Option<Token<'a>>, ParseError> {
        self.scanner.advance(1); // Skip '?'

        let end = match self.scanner.find_sequence(b"?>") {
            Some(end) => end,
            None => return self.incomplete(start, "processing instruction"),
        };

        let target = match self.read_name() {
            Some(target) if self.scanner.position() <= end => target,
            _ => return self.malformed(start, "processing instruction without target"),
        };
        let data = self.input[self.scanner.position()..end].trim();
        self.scanner.set_position(end + 2);

        let kind = if target.eq_ignore_ascii_case("xml") {
            TokenKind::XmlDeclaration
        } else {
            TokenKind::ProcessingInstruction
        };
        Ok(Some(
            Token::new(kind, (start, end + 2))
                .with_name(target)
                .with_content(Cow::Borrowed(data)),
        ))
    }

    /// A construct ran past the end of the region
    fn incomplete(&mut self, start: usize, what: &str) -> Result<Option<Token<'a>>, ParseError> {
        if self.is_final {
            self.scanner.set_position(self.scanner.len());
            return Err(ParseError::new(format!("unexpected end of input in {}", what), start));
        }
        self.unterminated = Some(start);
        Ok(None)
    }

    /// Report malformed markup and resynchronise after the next '>'
    fn malformed(&mut self, start: usize, message: &str) -> Result<Option<Token<'a>>, ParseError> {
        self.scanner.set_position(start);
        match self.scanner.find_byte(b'>') {
            Some(gt) => self.scanner.set_position(gt + 1),
            None => self.scanner.set_position(self.scanner.len()),
        }
        Err(ParseError::new(message, start))
    }

    /// Names end at an ASCII delimiter, so the slice is always on a
    /// character boundary of the UTF-8 region
    fn read_name(&mut self) -> Option<&'a str> {
        let start = self.scanner.position();
        self.scanner.read_name()?;
        Some(&self.input[start..self.scanner.position()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(input: &str, is_final: bool) -> (Vec<Token<'_>>, Vec<ParseError>, Option<usize>) {
        let mut tokenizer = Tokenizer::new(input, is_final);
        let mut tokens = Vec::new();
        let mut errors = Vec::new();
        loop {
            match tokenizer.next_token() {
                Ok(Some(token)) => tokens.push(token),
                Ok(None) => break,
                Err(e) => errors.push(e),
            }
        }
        (tokens, errors, tokenizer.unterminated())
    }

    fn kinds(tokens: &[Token<'_>]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_document() {
        let (tokens, errors, _) = collect("<root><item id=\"1\">text</item><empty/></root>", true);
        assert!(errors.is_empty());
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::StartTag,
                TokenKind::StartTag,
                TokenKind::Text,
                TokenKind::EndTag,
                TokenKind::EmptyTag,
                TokenKind::EndTag,
            ]
        );
        assert_eq!(tokens[1].name, Some("item"));
        assert_eq!(tokens[1].content.as_deref(), Some(" id=\"1\""));
        assert_eq!(tokens[4].name, Some("empty"));
        assert_eq!(tokens[4].content.as_deref(), Some(""));
    }

    #[test]
    fn test_text_entities_decoded() {
        let (tokens, _, _) = collect("<a>fish &amp; chips</a>", true);
        assert_eq!(tokens[1].content.as_deref(), Some("fish & chips"));
    }

    #[test]
    fn test_comment_with_gt() {
        let (tokens, errors, _) = collect("<a><!-- x > y --><![CDATA[<raw>]]></a>", true);
        assert!(errors.is_empty());
        assert_eq!(tokens[1].kind, TokenKind::Comment);
        assert_eq!(tokens[1].content.as_deref(), Some(" x > y "));
        assert_eq!(tokens[2].kind, TokenKind::CData);
        assert_eq!(tokens[2].content.as_deref(), Some("<raw>"));
    }

    #[test]
    fn test_declaration_and_doctype() {
        let input = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE Shop [<!ENTITY a \"b>\">]><Shop/>";
        let (tokens, errors, _) = collect(input, true);
        assert!(errors.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::XmlDeclaration);
        assert_eq!(tokens[0].content.as_deref(), Some("version=\"1.0\" encoding=\"UTF-8\""));
        assert_eq!(tokens[2].kind, TokenKind::DocType);
        assert_eq!(tokens[3].kind, TokenKind::EmptyTag);
    }

    #[test]
    fn test_unterminated_in_non_final_region() {
        let (tokens, errors, unterminated) = collect("<a>text</a><!-- open >", false);
        assert!(errors.is_empty());
        assert_eq!(tokens.len(), 3);
        assert_eq!(unterminated, Some(11));

        let (_, _, unterminated) = collect("<a>trailing", false);
        assert_eq!(unterminated, Some(3));
    }

    #[test]
    fn test_unterminated_in_final_region() {
        let (tokens, errors, unterminated) = collect("<a>ok</a><b", true);
        assert_eq!(tokens.len(), 3);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].position, 9);
        assert_eq!(unterminated, None);
    }

    #[test]
    fn test_trailing_text_in_final_region() {
        let (tokens, errors, _) = collect("<a/>\n", true);
        assert!(errors.is_empty());
        assert_eq!(kinds(&tokens), vec![TokenKind::EmptyTag, TokenKind::Text]);
    }

    #[test]
    fn test_malformed_markup_resyncs() {
        let (tokens, errors, _) = collect("<a>< 1 bad><b>ok</b></a>", true);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].position, 3);
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::StartTag,
                TokenKind::StartTag,
                TokenKind::Text,
                TokenKind::EndTag,
                TokenKind::EndTag,
            ]
        );
    }

    #[test]
    fn test_multibyte_names_and_text() {
        let (tokens, errors, _) = collect("<tétel>Fürdő</tétel>", true);
        assert!(errors.is_empty());
        assert_eq!(tokens[0].name, Some("tétel"));
        assert_eq!(tokens[1].content.as_deref(), Some("Fürdő"));
        assert_eq!(tokens[2].name, Some("tétel"));
    }

    #[test]
    fn test_error_rebased() {
        let err = ParseError::new("bad", 4).rebased(100);
        assert_eq!(err.position, 104);
        assert_eq!(err.to_string(), "bad at byte 104");
    }
}
