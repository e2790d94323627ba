//! PDF Object Stream Parser
//!
//! Handles compressed objects stored in object streams (PDF 1.5+,
//! ISO 32000-1 Section 7.5.7).

use super::filters::FilterRegistry;
use super::lexer::{Lexer, Token};
use super::objects::ObjectParser;
use super::{ParseError, ParseOptions, ParseResult};
use crate::objects::{Object, Stream};
use std::io::Cursor;
use tracing::warn;

/// Decoded object stream: members in slot order.
#[derive(Debug, Clone)]
pub struct ObjectStream {
    members: Vec<(u32, Option<Object>)>,
}

impl ObjectStream {
    /// Decode the container and parse every member.
    pub fn parse(
        stream: &Stream,
        filters: &FilterRegistry,
        options: &ParseOptions,
    ) -> ParseResult<Self> {
        let dict = stream.dictionary();
        let n = dict
            .get_integer("N")
            .filter(|n| *n >= 0)
            .ok_or_else(|| ParseError::MissingKey("N".to_string()))? as usize;
        let first = dict
            .get_integer("First")
            .filter(|f| *f >= 0)
            .ok_or_else(|| ParseError::MissingKey("First".to_string()))? as u64;

        let data = filters.decode_stream(stream)?;
        let mut cursor = Cursor::new(data.as_slice());

        // `/N` is untrusted; the header cannot list more slots than it has bytes
        let mut slots = Vec::with_capacity(n.min(data.len()));
        {
            let mut lexer = Lexer::new(&mut cursor);
            for _ in 0..n {
                let number = match lexer.next_token()? {
                    Token::Integer(v) if v >= 0 => v as u32,
                    other => {
                        return Err(ParseError::SyntaxError {
                            position: lexer.position(),
                            message: format!("Expected object number in object stream, found {other:?}"),
                        })
                    }
                };
                let offset = match lexer.next_token()? {
                    Token::Integer(v) if v >= 0 => v as u64,
                    other => {
                        return Err(ParseError::SyntaxError {
                            position: lexer.position(),
                            message: format!("Expected offset in object stream, found {other:?}"),
                        })
                    }
                };
                slots.push((number, offset));
            }
        }

        let mut members = Vec::with_capacity(slots.len());
        for (number, offset) in slots {
            let start = first + offset;
            cursor.set_position(start);
            let mut lexer = Lexer::with_offset(&mut cursor, start as usize);
            let object = match ObjectParser::new(&mut lexer, options).parse_object() {
                Ok(object) => Some(object),
                Err(e) if options.lenient_syntax => {
                    warn!("Object {} in object stream is unreadable: {}", number, e);
                    None
                }
                Err(e) => return Err(e),
            };
            members.push((number, object));
        }

        Ok(Self { members })
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member at `slot`, falling back to a search by number when the slot
    /// holds a different object.
    pub fn get(&self, number: u32, slot: u32) -> Option<&Object> {
        match self.members.get(slot as usize) {
            Some((n, object)) if *n == number => object.as_ref(),
            _ => self
                .members
                .iter()
                .find(|(n, _)| *n == number)
                .and_then(|(_, object)| object.as_ref()),
        }
    }

    /// Member numbers in slot order.
    pub fn object_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.members.iter().map(|(n, _)| *n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{Dictionary, ObjectId};

    fn container(header: &str, body: &str, n: i64) -> Stream {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("ObjStm"));
        dict.set("N", n);
        dict.set("First", header.len() as i64);
        Stream::with_dictionary(dict, format!("{header}{body}").into_bytes())
    }

    fn parse(stream: &Stream) -> ParseResult<ObjectStream> {
        ObjectStream::parse(stream, &FilterRegistry::default(), &ParseOptions::default())
    }

    #[test]
    fn test_parse_members() {
        let body = "<< /T (a) /Parent 12 0 R >> [1 2] 42";
        let header = "10 0 11 28 13 34 ";
        let objstm = parse(&container(header, body, 3)).unwrap();

        assert_eq!(objstm.len(), 3);
        let first = objstm.get(10, 0).unwrap();
        assert_eq!(
            first.as_dict().unwrap().get_reference("Parent"),
            Some(ObjectId::new(12, 0))
        );
        assert_eq!(objstm.get(11, 1), Some(&Object::from(vec![Object::Integer(1), Object::Integer(2)])));
        assert_eq!(objstm.get(13, 2), Some(&Object::Integer(42)));
        assert_eq!(objstm.object_numbers().collect::<Vec<_>>(), vec![10, 11, 13]);
    }

    #[test]
    fn test_wrong_slot_falls_back_to_number() {
        let objstm = parse(&container("5 0 6 3 ", "1  (two)", 2)).unwrap();
        assert_eq!(objstm.get(6, 0), Some(&Object::string("two")));
        assert_eq!(objstm.get(7, 0), None);
    }

    #[test]
    fn test_missing_n_is_error() {
        let mut dict = Dictionary::new();
        dict.set("First", 0);
        let stream = Stream::with_dictionary(dict, Vec::new());
        assert!(matches!(parse(&stream), Err(ParseError::MissingKey(_))));
    }

    #[test]
    fn test_damaged_member_is_skipped() {
        let objstm = parse(&container("1 0 2 3 ", ">> 7", 2)).unwrap();
        assert_eq!(objstm.get(1, 0), None);
        assert_eq!(objstm.get(2, 1), Some(&Object::Integer(7)));
    }
}
