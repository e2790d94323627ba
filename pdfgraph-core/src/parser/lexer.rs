//! PDF Lexer
//!
//! Tokenizes PDF syntax according to ISO 32000-1 Section 7.2

use super::{ParseError, ParseResult};
use std::io::{BufReader, Read, Seek, SeekFrom};

/// PDF Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Boolean(bool),
    Integer(i64),
    Real(f64),
    /// String (literal or hexadecimal), already unescaped
    String(Vec<u8>),
    /// Name object without the leading slash, `#xx` escapes applied
    Name(String),
    ArrayStart,
    ArrayEnd,
    DictStart,
    DictEnd,
    Stream,
    EndStream,
    Obj,
    EndObj,
    StartXRef,
    Null,
    /// Any other bare word: `R`, `xref`, `trailer`, `n`, `f`, ...
    Keyword(String),
    Comment(String),
    Eof,
}

/// Saved lexer state, see [`Lexer::save_position`].
#[derive(Debug, Clone, Copy)]
pub struct LexerMark {
    stream_pos: u64,
    position: usize,
    peek: Option<u8>,
}

/// PDF Lexer for tokenizing PDF content
pub struct Lexer<R> {
    reader: BufReader<R>,
    position: usize,
    peek_buffer: Option<u8>,
    token_buffer: Vec<Token>,
}

fn is_delimiter(ch: u8) -> bool {
    matches!(
        ch,
        b'/' | b'<' | b'>' | b'[' | b']' | b'(' | b')' | b'{' | b'}' | b'%'
    )
}

/// PDF whitespace includes NUL alongside the ASCII set.
pub(crate) fn is_pdf_whitespace(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\n' | b'\r' | b'\x0C' | b'\0')
}

impl<R: Read> Lexer<R> {
    pub fn new(reader: R) -> Self {
        Self::with_offset(reader, 0)
    }

    /// Lexer whose reported positions start at `offset`, for readers that
    /// were already seeked into a file.
    pub fn with_offset(reader: R, offset: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            position: offset,
            peek_buffer: None,
            token_buffer: Vec::new(),
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> ParseResult<Token> {
        if let Some(token) = self.token_buffer.pop() {
            return Ok(token);
        }

        self.skip_whitespace()?;

        let ch = match self.peek_char()? {
            Some(ch) => ch,
            None => return Ok(Token::Eof),
        };

        match ch {
            b'%' => self.read_comment(),
            b'/' => self.read_name(),
            b'(' => self.read_literal_string(),
            b'<' => self.read_angle_bracket(),
            b'>' => {
                self.consume_char()?;
                if self.peek_char()? == Some(b'>') {
                    self.consume_char()?;
                    Ok(Token::DictEnd)
                } else {
                    Err(self.syntax_error("Expected '>' after '>'"))
                }
            }
            b'[' => {
                self.consume_char()?;
                Ok(Token::ArrayStart)
            }
            b']' => {
                self.consume_char()?;
                Ok(Token::ArrayEnd)
            }
            b'+' | b'-' | b'0'..=b'9' | b'.' => self.read_number(),
            _ if ch.is_ascii_alphabetic() => self.read_keyword(),
            _ => Err(self.syntax_error(&format!("Unexpected character: {}", ch as char))),
        }
    }

    fn syntax_error(&self, message: &str) -> ParseError {
        ParseError::SyntaxError {
            position: self.position,
            message: message.to_string(),
        }
    }

    fn peek_char(&mut self) -> ParseResult<Option<u8>> {
        if let Some(ch) = self.peek_buffer {
            return Ok(Some(ch));
        }

        let mut buf = [0u8; 1];
        match self.reader.read_exact(&mut buf) {
            Ok(_) => {
                self.peek_buffer = Some(buf[0]);
                Ok(Some(buf[0]))
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn consume_char(&mut self) -> ParseResult<Option<u8>> {
        let ch = self.peek_char()?;
        if ch.is_some() {
            self.peek_buffer = None;
            self.position += 1;
        }
        Ok(ch)
    }

    /// Skip whitespace and return the number of bytes skipped
    pub(crate) fn skip_whitespace(&mut self) -> ParseResult<usize> {
        let mut count = 0;
        while let Some(ch) = self.peek_char()? {
            if is_pdf_whitespace(ch) {
                self.consume_char()?;
                count += 1;
            } else {
                break;
            }
        }
        Ok(count)
    }

    fn read_comment(&mut self) -> ParseResult<Token> {
        self.consume_char()?;
        let mut comment = String::new();

        while let Some(ch) = self.peek_char()? {
            if ch == b'\n' || ch == b'\r' {
                break;
            }
            self.consume_char()?;
            comment.push(ch as char);
        }

        Ok(Token::Comment(comment))
    }

    fn read_name(&mut self) -> ParseResult<Token> {
        self.consume_char()?;
        let mut name = String::new();

        while let Some(ch) = self.peek_char()? {
            if is_pdf_whitespace(ch) || is_delimiter(ch) {
                break;
            }
            self.consume_char()?;

            // /A#20B means /A B
            if ch == b'#' {
                let hex1 = self
                    .consume_char()?
                    .ok_or_else(|| self.syntax_error("Incomplete hex code in name"))?;
                let hex2 = self
                    .consume_char()?
                    .ok_or_else(|| self.syntax_error("Incomplete hex code in name"))?;

                let value = hex_value(hex1)
                    .zip(hex_value(hex2))
                    .map(|(hi, lo)| (hi << 4) | lo)
                    .ok_or_else(|| self.syntax_error("Invalid hex code in name"))?;

                name.push(value as char);
            } else {
                name.push(ch as char);
            }
        }

        Ok(Token::Name(name))
    }

    fn read_literal_string(&mut self) -> ParseResult<Token> {
        self.consume_char()?;
        let mut string = Vec::new();
        let mut paren_depth = 1;
        let mut escape = false;

        while paren_depth > 0 {
            let ch = self
                .consume_char()?
                .ok_or_else(|| self.syntax_error("Unterminated string"))?;

            if escape {
                escape = false;
                let escaped = match ch {
                    b'n' => b'\n',
                    b'r' => b'\r',
                    b't' => b'\t',
                    b'b' => b'\x08',
                    b'f' => b'\x0C',
                    b'(' => b'(',
                    b')' => b')',
                    b'\\' => b'\\',
                    b'0'..=b'7' => {
                        let mut value = (ch - b'0') as u16;
                        for _ in 0..2 {
                            match self.peek_char()? {
                                Some(next @ b'0'..=b'7') => {
                                    self.consume_char()?;
                                    value = value * 8 + (next - b'0') as u16;
                                }
                                _ => break,
                            }
                        }
                        (value & 0xFF) as u8
                    }
                    // Line continuation
                    b'\r' => {
                        if self.peek_char()? == Some(b'\n') {
                            self.consume_char()?;
                        }
                        continue;
                    }
                    b'\n' => continue,
                    _ => ch,
                };
                string.push(escaped);
            } else {
                match ch {
                    b'\\' => escape = true,
                    b'(' => {
                        string.push(ch);
                        paren_depth += 1;
                    }
                    b')' => {
                        paren_depth -= 1;
                        if paren_depth > 0 {
                            string.push(ch);
                        }
                    }
                    _ => string.push(ch),
                }
            }
        }

        Ok(Token::String(string))
    }

    /// Hex string or `<<`
    fn read_angle_bracket(&mut self) -> ParseResult<Token> {
        self.consume_char()?;

        if self.peek_char()? == Some(b'<') {
            self.consume_char()?;
            return Ok(Token::DictStart);
        }

        let mut nibbles = Vec::new();
        let mut found_end = false;

        while let Some(ch) = self.consume_char()? {
            if ch == b'>' {
                found_end = true;
                break;
            }
            match hex_value(ch) {
                Some(v) => nibbles.push(v),
                None if is_pdf_whitespace(ch) => {}
                None => return Err(self.syntax_error("Invalid character in hex string")),
            }
        }

        if !found_end {
            return Err(self.syntax_error("Unterminated hex string"));
        }

        // A trailing odd digit is followed by an implied 0
        if nibbles.len() % 2 != 0 {
            nibbles.push(0);
        }

        let bytes = nibbles
            .chunks(2)
            .map(|pair| (pair[0] << 4) | pair[1])
            .collect();
        Ok(Token::String(bytes))
    }

    fn read_number(&mut self) -> ParseResult<Token> {
        let mut number_str = String::new();
        let mut has_dot = false;

        if let Some(ch @ (b'+' | b'-')) = self.peek_char()? {
            self.consume_char()?;
            number_str.push(ch as char);
            // Some writers emit "--5"; collapse repeated signs
            while let Some(b'-' | b'+') = self.peek_char()? {
                self.consume_char()?;
            }
        }

        while let Some(ch) = self.peek_char()? {
            match ch {
                b'0'..=b'9' => {
                    self.consume_char()?;
                    number_str.push(ch as char);
                }
                b'.' if !has_dot => {
                    self.consume_char()?;
                    number_str.push(ch as char);
                    has_dot = true;
                }
                _ => break,
            }
        }

        let digits = number_str.trim_start_matches(['+', '-']);
        if digits.is_empty() || digits == "." {
            // A lone sign or dot reads as zero
            return Ok(if has_dot {
                Token::Real(0.0)
            } else {
                Token::Integer(0)
            });
        }

        if has_dot {
            let normalized = if number_str.ends_with('.') {
                format!("{number_str}0")
            } else {
                number_str.clone()
            };
            let value = normalized
                .parse::<f64>()
                .map_err(|_| self.syntax_error(&format!("Invalid real number: '{number_str}'")))?;
            Ok(Token::Real(value))
        } else {
            match number_str.parse::<i64>() {
                Ok(value) => Ok(Token::Integer(value)),
                // Out-of-range integers degrade to reals
                Err(_) => number_str
                    .parse::<f64>()
                    .map(Token::Real)
                    .map_err(|_| self.syntax_error(&format!("Invalid integer: '{number_str}'"))),
            }
        }
    }

    fn read_keyword(&mut self) -> ParseResult<Token> {
        let word = self.read_word()?;
        Ok(match word.as_str() {
            "true" => Token::Boolean(true),
            "false" => Token::Boolean(false),
            "null" => Token::Null,
            "stream" => Token::Stream,
            "endstream" => Token::EndStream,
            "obj" => Token::Obj,
            "endobj" => Token::EndObj,
            "startxref" => Token::StartXRef,
            _ => Token::Keyword(word),
        })
    }

    fn read_word(&mut self) -> ParseResult<String> {
        let mut word = String::new();

        while let Some(ch) = self.peek_char()? {
            if is_pdf_whitespace(ch) || is_delimiter(ch) {
                break;
            }
            self.consume_char()?;
            word.push(ch as char);
        }

        Ok(word)
    }

    /// Consume the end-of-line marker after the `stream` keyword.
    /// A lone CR is tolerated.
    pub fn read_newline(&mut self) -> ParseResult<()> {
        match self.peek_char()? {
            Some(b'\r') => {
                self.consume_char()?;
                if self.peek_char()? == Some(b'\n') {
                    self.consume_char()?;
                }
                Ok(())
            }
            Some(b'\n') => {
                self.consume_char()?;
                Ok(())
            }
            _ => Err(self.syntax_error("Expected newline")),
        }
    }

    /// Skip spaces and tabs only, leaving line breaks in place.
    pub fn skip_inline_whitespace(&mut self) -> ParseResult<()> {
        while let Some(b' ' | b'\t') = self.peek_char()? {
            self.consume_char()?;
        }
        Ok(())
    }

    /// Read exactly n bytes
    pub fn read_bytes(&mut self, n: usize) -> ParseResult<Vec<u8>> {
        let mut bytes = Vec::with_capacity(n);
        if let Some(ch) = self.peek_buffer.take() {
            if n > 0 {
                bytes.push(ch);
            } else {
                self.peek_buffer = Some(ch);
            }
        }
        let remaining = n - bytes.len();
        let mut rest = vec![0u8; remaining];
        self.reader.read_exact(&mut rest)?;
        bytes.extend_from_slice(&rest);
        self.position += n;
        Ok(bytes)
    }

    /// Read until `sequence` is found. The sequence itself is consumed but
    /// not returned.
    pub fn read_until_sequence(&mut self, sequence: &[u8]) -> ParseResult<Vec<u8>> {
        let mut result = Vec::new();

        while let Some(ch) = self.consume_char()? {
            result.push(ch);
            if result.ends_with(sequence) {
                result.truncate(result.len() - sequence.len());
                return Ok(result);
            }
        }

        Err(self.syntax_error(&format!(
            "Sequence {:?} not found",
            String::from_utf8_lossy(sequence)
        )))
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Push back a token to be returned by the next call to next_token.
    /// Tokens come back in LIFO order.
    pub fn push_token(&mut self, token: Token) {
        self.token_buffer.push(token);
    }

    pub fn expect_keyword(&mut self, keyword: &str) -> ParseResult<()> {
        let token = self.next_token()?;
        let matched = match (keyword, &token) {
            ("endstream", Token::EndStream)
            | ("stream", Token::Stream)
            | ("endobj", Token::EndObj)
            | ("obj", Token::Obj)
            | ("startxref", Token::StartXRef) => true,
            (expected, Token::Keyword(word)) => expected == word,
            _ => false,
        };
        if matched {
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken {
                expected: format!("keyword '{keyword}'"),
                found: format!("{token:?}"),
            })
        }
    }
}

impl<R: Read + Seek> Lexer<R> {
    /// Save the current position for later restoration. Pushed-back
    /// tokens are not part of the mark.
    pub fn save_position(&mut self) -> ParseResult<LexerMark> {
        Ok(LexerMark {
            stream_pos: self.reader.stream_position()?,
            position: self.position,
            peek: self.peek_buffer,
        })
    }

    pub fn restore_position(&mut self, mark: LexerMark) -> ParseResult<()> {
        self.reader.seek(SeekFrom::Start(mark.stream_pos))?;
        self.peek_buffer = mark.peek;
        self.position = mark.position;
        self.token_buffer.clear();
        Ok(())
    }
}

fn hex_value(ch: u8) -> Option<u8> {
    match ch {
        b'0'..=b'9' => Some(ch - b'0'),
        b'a'..=b'f' => Some(ch - b'a' + 10),
        b'A'..=b'F' => Some(ch - b'A' + 10),
        _ => None,
    }
}
