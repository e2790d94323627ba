//! PDF Object Parser
//!
//! Builds [`Object`] values from lexer tokens according to ISO 32000-1
//! Section 7.3. Indirect references are kept as `Reference` values; nothing
//! here looks up other objects.

use super::lexer::{Lexer, Token};
use super::{ParseError, ParseOptions, ParseResult};
use crate::objects::{Dictionary, Object, ObjectId, PdfString, Stream};
use std::io::{Read, Seek};
use tracing::warn;

/// Recursive-descent parser over a [`Lexer`].
pub struct ObjectParser<'l, R> {
    lexer: &'l mut Lexer<R>,
    options: &'l ParseOptions,
    depth: usize,
}

impl<'l, R: Read + Seek> ObjectParser<'l, R> {
    pub fn new(lexer: &'l mut Lexer<R>, options: &'l ParseOptions) -> Self {
        Self {
            lexer,
            options,
            depth: 0,
        }
    }

    /// Parse the next direct object.
    pub fn parse_object(&mut self) -> ParseResult<Object> {
        let token = self.next_significant()?;
        self.parse_from_token(token)
    }

    /// Parse `N G obj <object> endobj`.
    pub fn parse_indirect_object(&mut self) -> ParseResult<(ObjectId, Object)> {
        let number = match self.next_significant()? {
            Token::Integer(n) if n >= 0 => n as u32,
            other => {
                return Err(ParseError::UnexpectedToken {
                    expected: "object number".to_string(),
                    found: format!("{other:?}"),
                })
            }
        };
        let generation = match self.next_significant()? {
            Token::Integer(g) if (0..=u16::MAX as i64).contains(&g) => g as u16,
            other => {
                return Err(ParseError::UnexpectedToken {
                    expected: "generation number".to_string(),
                    found: format!("{other:?}"),
                })
            }
        };
        self.lexer.expect_keyword("obj")?;

        let object = match self.next_significant()? {
            // "N G obj endobj" declares an empty object
            Token::EndObj => return Ok((ObjectId::new(number, generation), Object::Null)),
            token => self.parse_from_token(token)?,
        };

        match self.next_significant()? {
            Token::EndObj => {}
            other if self.options.lenient_syntax => {
                warn!(
                    "Object {} {} not closed by endobj (found {:?})",
                    number, generation, other
                );
            }
            other => {
                return Err(ParseError::UnexpectedToken {
                    expected: "endobj".to_string(),
                    found: format!("{other:?}"),
                })
            }
        }

        Ok((ObjectId::new(number, generation), object))
    }

    fn next_significant(&mut self) -> ParseResult<Token> {
        loop {
            match self.lexer.next_token()? {
                Token::Comment(_) => continue,
                token => return Ok(token),
            }
        }
    }

    fn parse_from_token(&mut self, token: Token) -> ParseResult<Object> {
        match token {
            Token::Null => Ok(Object::Null),
            Token::Boolean(b) => Ok(Object::Boolean(b)),
            Token::Integer(i) => self.parse_integer_or_reference(i),
            Token::Real(r) => Ok(Object::Real(r)),
            Token::String(s) => Ok(Object::String(PdfString(s))),
            Token::Name(n) => Ok(Object::Name(n)),
            Token::ArrayStart => self.nested(Self::parse_array),
            Token::DictStart => self.nested(Self::parse_dictionary_or_stream),
            Token::Eof => Err(ParseError::SyntaxError {
                position: self.lexer.position(),
                message: "Unexpected end of file".to_string(),
            }),
            other => Err(ParseError::UnexpectedToken {
                expected: "PDF object".to_string(),
                found: format!("{other:?}"),
            }),
        }
    }

    fn nested(&mut self, parse: fn(&mut Self) -> ParseResult<Object>) -> ParseResult<Object> {
        if self.depth >= self.options.max_recursion_depth {
            return Err(ParseError::SyntaxError {
                position: self.lexer.position(),
                message: format!(
                    "Nesting deeper than {} levels",
                    self.options.max_recursion_depth
                ),
            });
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// `N G R` is only recognized with two tokens of lookahead.
    fn parse_integer_or_reference(&mut self, first: i64) -> ParseResult<Object> {
        let second = self.lexer.next_token()?;
        let Token::Integer(generation) = second else {
            self.lexer.push_token(second);
            return Ok(Object::Integer(first));
        };

        let third = self.lexer.next_token()?;
        match &third {
            Token::Keyword(k)
                if k == "R"
                    && first >= 0
                    && first <= u32::MAX as i64
                    && (0..=u16::MAX as i64).contains(&generation) =>
            {
                Ok(Object::Reference(ObjectId::new(
                    first as u32,
                    generation as u16,
                )))
            }
            _ => {
                self.lexer.push_token(third);
                self.lexer.push_token(Token::Integer(generation));
                Ok(Object::Integer(first))
            }
        }
    }

    fn parse_array(&mut self) -> ParseResult<Object> {
        let mut elements = Vec::new();

        loop {
            match self.next_significant()? {
                Token::ArrayEnd => break,
                token => elements.push(self.parse_from_token(token)?),
            }
        }

        Ok(Object::Array(elements))
    }

    fn parse_dictionary_or_stream(&mut self) -> ParseResult<Object> {
        let dict = self.parse_dictionary_inner()?;

        match self.next_significant()? {
            Token::Stream => {
                let data = self.parse_stream_data(&dict)?;
                let mut stream = Stream::with_dictionary(dict.clone(), data);
                // Keep an indirect /Length visible so the reader can check it
                if let Some(length @ Object::Reference(_)) = dict.get("Length") {
                    stream.dictionary_mut().set("Length", length.clone());
                }
                Ok(Object::Stream(stream))
            }
            token => {
                self.lexer.push_token(token);
                Ok(Object::Dictionary(dict))
            }
        }
    }

    fn parse_dictionary_inner(&mut self) -> ParseResult<Dictionary> {
        let mut dict = Dictionary::new();

        loop {
            match self.next_significant()? {
                Token::DictEnd => break,
                Token::Name(key) => {
                    let value = match self.next_significant()? {
                        // "/Key >>" with the value missing
                        Token::DictEnd if self.options.lenient_syntax => {
                            warn!("Dictionary key /{} has no value", key);
                            dict.set(key, Object::Null);
                            break;
                        }
                        token => self.parse_from_token(token)?,
                    };
                    dict.set(key, value);
                }
                other => {
                    return Err(ParseError::UnexpectedToken {
                        expected: "dictionary key (name) or >>".to_string(),
                        found: format!("{other:?}"),
                    });
                }
            }
        }

        Ok(dict)
    }

    /// Read the payload between `stream` and `endstream`. A direct
    /// `/Length` is trusted when `endstream` follows it; otherwise (and for
    /// indirect lengths) the payload runs up to the `endstream` keyword.
    fn parse_stream_data(&mut self, dict: &Dictionary) -> ParseResult<Vec<u8>> {
        self.lexer.skip_inline_whitespace()?;
        if self.lexer.read_newline().is_err() && !self.options.lenient_syntax {
            return Err(ParseError::SyntaxError {
                position: self.lexer.position(),
                message: "Expected end of line after 'stream'".to_string(),
            });
        }

        let declared = match dict.get("Length") {
            Some(Object::Integer(len)) if *len >= 0 => Some(*len as usize),
            Some(Object::Reference(_)) => None,
            Some(other) if self.options.lenient_syntax => {
                warn!("Stream /Length has type {}, scanning for endstream", other.type_name());
                None
            }
            None if self.options.lenient_syntax => {
                warn!("Stream without /Length, scanning for endstream");
                None
            }
            _ => return Err(ParseError::MissingKey("Length".to_string())),
        };

        if let Some(length) = declared {
            let mark = self.lexer.save_position()?;
            if let Ok(data) = self.lexer.read_bytes(length) {
                if self.next_significant().ok() == Some(Token::EndStream) {
                    return Ok(data);
                }
            }
            if !self.options.lenient_syntax {
                return Err(ParseError::SyntaxError {
                    position: self.lexer.position(),
                    message: format!("Stream /Length {length} does not end at endstream"),
                });
            }
            warn!("Stream /Length {} is wrong, scanning for endstream", length);
            self.lexer.restore_position(mark)?;
        }

        let mut data = self.lexer.read_until_sequence(b"endstream")?;
        trim_trailing_eol(&mut data);
        Ok(data)
    }
}

/// Drop the end-of-line that separates the payload from `endstream`.
pub(crate) fn trim_trailing_eol(data: &mut Vec<u8>) {
    if data.ends_with(b"\r\n") {
        data.truncate(data.len() - 2);
    } else if data.ends_with(b"\n") || data.ends_with(b"\r") {
        data.truncate(data.len() - 1);
    }
}

/// Parse one direct object from a byte slice.
pub fn parse_object_from_bytes(bytes: &[u8], options: &ParseOptions) -> ParseResult<Object> {
    let mut lexer = Lexer::new(std::io::Cursor::new(bytes));
    ObjectParser::new(&mut lexer, options).parse_object()
}
