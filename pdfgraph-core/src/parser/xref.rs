//! PDF Cross-Reference Index
//!
//! Builds the object-number index from xref tables (ISO 32000-1 Section
//! 7.5.4), xref streams (7.5.8) and hybrid files, following `/Prev` links.
//! Only locations are recorded here; object bodies are never parsed.

use super::filters::FilterRegistry;
use super::lexer::{Lexer, Token};
use super::objects::ObjectParser;
use super::xref_stream::XRefStream;
use super::{ParseError, ParseOptions, ParseResult};
use crate::objects::{Dictionary, Object};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{Read, Seek, SeekFrom};
use tracing::{debug, warn};

/// How far from the end of the file `startxref` is searched for.
const STARTXREF_WINDOW: u64 = 2048;

/// Where an object lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefEntry {
    Free { next_free: u32, generation: u16 },
    /// `N G obj` record starting at `offset`.
    InUse { offset: u64, generation: u16 },
    /// Slot `index` of the object stream `stream_number`.
    Compressed { stream_number: u32, index: u32 },
}

impl XRefEntry {
    /// Objects in object streams always have generation 0.
    pub fn generation(&self) -> u16 {
        match self {
            XRefEntry::Free { generation, .. } | XRefEntry::InUse { generation, .. } => *generation,
            XRefEntry::Compressed { .. } => 0,
        }
    }

    pub fn is_in_use(&self) -> bool {
        !matches!(self, XRefEntry::Free { .. })
    }
}

/// One xref section and the trailer that came with it.
#[derive(Debug, Default)]
struct Section {
    entries: HashMap<u32, XRefEntry>,
    trailer: Dictionary,
}

/// Cross-reference index of a document.
#[derive(Debug, Clone, Default)]
pub struct XRefTable {
    entries: BTreeMap<u32, XRefEntry>,
    trailer: Dictionary,
    sections: usize,
    recovered: bool,
}

impl XRefTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the index starting at the file's `startxref`, newest section
    /// first. Entries already known shadow those of older sections.
    pub fn parse<R: Read + Seek>(
        reader: &mut R,
        options: &ParseOptions,
        filters: &FilterRegistry,
    ) -> ParseResult<Self> {
        let file_len = reader.seek(SeekFrom::End(0))?;
        let start = Self::find_startxref(reader)?;

        let mut table = Self::new();
        let mut visited = HashSet::new();
        let mut next = Some(start);

        while let Some(offset) = next.take() {
            if !visited.insert(offset) {
                warn!("Xref /Prev chain loops back to offset {}", offset);
                break;
            }
            if visited.len() > options.max_xref_sections {
                warn!(
                    "Xref chain longer than {} sections, ignoring the rest",
                    options.max_xref_sections
                );
                break;
            }
            if offset >= file_len {
                return Err(ParseError::MalformedIndex(format!(
                    "xref offset {offset} beyond end of file ({file_len} bytes)"
                )));
            }

            let section = match Self::load_section(reader, offset, options, filters, true) {
                Ok(section) => section,
                // The newest section is mandatory, older ones are best effort
                Err(e) if table.sections > 0 && options.lenient_syntax => {
                    warn!("Skipping unreadable xref section at {}: {}", offset, e);
                    break;
                }
                Err(e) => return Err(e),
            };

            next = section
                .trailer
                .get_integer("Prev")
                .filter(|&prev| prev >= 0)
                .map(|prev| prev as u64);
            table.merge_older(section);
            table.sections += 1;
        }

        debug!(
            "Loaded {} xref entries from {} section(s)",
            table.entries.len(),
            table.sections
        );
        table.validate(file_len)?;
        Ok(table)
    }

    /// Offset named by the last `startxref` keyword.
    pub fn find_startxref<R: Read + Seek>(reader: &mut R) -> ParseResult<u64> {
        let file_len = reader.seek(SeekFrom::End(0))?;
        let window = file_len.min(STARTXREF_WINDOW);
        reader.seek(SeekFrom::Start(file_len - window))?;
        let mut tail = vec![0u8; window as usize];
        reader.read_exact(&mut tail)?;

        let keyword = b"startxref";
        let at = tail
            .windows(keyword.len())
            .rposition(|w| w == keyword)
            .ok_or_else(|| ParseError::MalformedIndex("startxref not found".to_string()))?;

        let digits: String = tail[at + keyword.len()..]
            .iter()
            .skip_while(|b| b.is_ascii_whitespace())
            .take_while(|b| b.is_ascii_digit())
            .map(|&b| b as char)
            .collect();
        digits
            .parse::<u64>()
            .map_err(|_| ParseError::MalformedIndex("startxref has no offset".to_string()))
    }

    fn load_section<R: Read + Seek>(
        reader: &mut R,
        offset: u64,
        options: &ParseOptions,
        filters: &FilterRegistry,
        follow_companion: bool,
    ) -> ParseResult<Section> {
        reader.seek(SeekFrom::Start(offset))?;
        let mut lexer = Lexer::with_offset(&mut *reader, offset as usize);

        let mut section = match lexer.next_token()? {
            Token::Keyword(word) if word == "xref" => Self::parse_table(&mut lexer, options)?,
            token @ Token::Integer(_) => {
                lexer.push_token(token);
                Self::parse_stream_section(&mut lexer, options, filters)?
            }
            other => {
                return Err(ParseError::MalformedIndex(format!(
                    "expected xref table or stream at offset {offset}, found {other:?}"
                )))
            }
        };
        drop(lexer);

        // Hybrid file: the table's companion stream fills in compressed
        // objects the table marks as free or leaves out
        let companion_offset = section
            .trailer
            .get_integer("XRefStm")
            .filter(|_| follow_companion);
        if let Some(stm_offset) = companion_offset {
            match Self::load_section(reader, stm_offset.max(0) as u64, options, filters, false) {
                Ok(companion) => {
                    for (number, entry) in companion.entries {
                        let replace = section
                            .entries
                            .get(&number)
                            .map_or(true, |existing| !existing.is_in_use());
                        if replace {
                            section.entries.insert(number, entry);
                        }
                    }
                }
                Err(e) => warn!("Ignoring unreadable /XRefStm at {}: {}", stm_offset, e),
            }
        }

        Ok(section)
    }

    fn parse_table<R: Read + Seek>(
        lexer: &mut Lexer<R>,
        options: &ParseOptions,
    ) -> ParseResult<Section> {
        let mut section = Section::default();

        loop {
            let first = match lexer.next_token()? {
                Token::Keyword(word) if word == "trailer" => break,
                Token::Comment(_) => continue,
                Token::Integer(first) => u32::try_from(first).map_err(|_| {
                    ParseError::MalformedIndex(format!("subsection start {first} out of range"))
                })?,
                other => {
                    return Err(ParseError::MalformedIndex(format!(
                        "expected subsection header or trailer, found {other:?}"
                    )))
                }
            };
            let count = match lexer.next_token()? {
                Token::Integer(count) => u32::try_from(count).map_err(|_| {
                    ParseError::MalformedIndex(format!("subsection count {count} out of range"))
                })?,
                other => {
                    return Err(ParseError::MalformedIndex(format!(
                        "bad subsection count: {other:?}"
                    )))
                }
            };

            let mut first = first;
            for i in 0..count {
                let entry = Self::parse_table_entry(lexer)?;
                // Writers sometimes start the table at 1 while listing the
                // object 0 free-list head first
                if i == 0
                    && first == 1
                    && matches!(
                        entry,
                        XRefEntry::Free {
                            generation: 65535,
                            ..
                        }
                    )
                    && options.lenient_syntax
                {
                    warn!("Xref subsection starts at 1 but lists object 0, renumbering");
                    first = 0;
                }
                let number = first.checked_add(i).ok_or_else(|| {
                    ParseError::MalformedIndex(format!(
                        "subsection {first} + {count} exceeds the object number range"
                    ))
                })?;
                section.entries.insert(number, entry);
            }
        }

        let mut parser = ObjectParser::new(lexer, options);
        section.trailer = match parser.parse_object()? {
            Object::Dictionary(dict) => dict,
            other => {
                return Err(ParseError::MalformedIndex(format!(
                    "trailer is a {}, not a dictionary",
                    other.type_name()
                )))
            }
        };
        Ok(section)
    }

    fn parse_table_entry<R: Read>(lexer: &mut Lexer<R>) -> ParseResult<XRefEntry> {
        let offset = match lexer.next_token()? {
            Token::Integer(n) if n >= 0 => n as u64,
            other => {
                return Err(ParseError::MalformedIndex(format!(
                    "bad xref entry offset: {other:?}"
                )))
            }
        };
        let generation = match lexer.next_token()? {
            Token::Integer(g) if (0..=u16::MAX as i64).contains(&g) => g as u16,
            other => {
                return Err(ParseError::MalformedIndex(format!(
                    "bad xref entry generation: {other:?}"
                )))
            }
        };
        match lexer.next_token()? {
            Token::Keyword(flag) if flag == "n" => Ok(XRefEntry::InUse { offset, generation }),
            Token::Keyword(flag) if flag == "f" => Ok(XRefEntry::Free {
                next_free: offset as u32,
                generation,
            }),
            other => Err(ParseError::MalformedIndex(format!(
                "bad xref entry flag: {other:?}"
            ))),
        }
    }

    fn parse_stream_section<R: Read + Seek>(
        lexer: &mut Lexer<R>,
        options: &ParseOptions,
        filters: &FilterRegistry,
    ) -> ParseResult<Section> {
        let (id, object) = ObjectParser::new(lexer, options).parse_indirect_object()?;
        let stream = match object {
            Object::Stream(stream) if stream.dictionary().get_type() == Some("XRef") => stream,
            other => {
                return Err(ParseError::MalformedIndex(format!(
                    "object {id} at xref offset is a {}, not an xref stream",
                    other.type_name()
                )))
            }
        };

        let xref_stream = XRefStream::parse(&stream, filters)?;
        Ok(Section {
            entries: xref_stream.entries().into_iter().collect(),
            trailer: xref_stream.trailer().clone(),
        })
    }

    /// Fold in an older section: existing entries and trailer keys win.
    fn merge_older(&mut self, section: Section) {
        for (number, entry) in section.entries {
            self.entries.entry(number).or_insert(entry);
        }
        for (key, value) in section.trailer {
            if key == "Prev" || key == "XRefStm" {
                continue;
            }
            if !self.trailer.contains_key(&key) {
                self.trailer.set(key, value);
            }
        }
    }

    fn validate(&self, file_len: u64) -> ParseResult<()> {
        if !self.trailer.contains_key("Root") {
            return Err(ParseError::MalformedIndex(
                "trailer has no /Root".to_string(),
            ));
        }
        if let Some((number, offset)) = self.entries.iter().find_map(|(n, e)| match e {
            XRefEntry::InUse { offset, .. } if *offset >= file_len => Some((*n, *offset)),
            _ => None,
        }) {
            return Err(ParseError::MalformedIndex(format!(
                "object {number} at offset {offset} beyond end of file ({file_len} bytes)"
            )));
        }
        Ok(())
    }

    pub fn get_entry(&self, number: u32) -> Option<&XRefEntry> {
        self.entries.get(&number)
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, number: u32, entry: XRefEntry) {
        self.entries.insert(number, entry);
    }

    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    pub fn set_trailer(&mut self, trailer: Dictionary) {
        self.trailer = trailer;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries by ascending object number.
    pub fn iter(&self) -> impl Iterator<Item = (&u32, &XRefEntry)> {
        self.entries.iter()
    }

    /// Highest object number with an entry.
    pub fn max_object_number(&self) -> u32 {
        self.entries.keys().next_back().copied().unwrap_or(0)
    }

    /// Number of sections read along the `/Prev` chain.
    pub fn section_count(&self) -> usize {
        self.sections
    }

    /// True when built by scanning the file instead of reading its index.
    pub fn is_recovered(&self) -> bool {
        self.recovered
    }

    pub(crate) fn mark_recovered(&mut self) {
        self.recovered = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::ObjectId;
    use crate::parser::test_helpers::PdfBuilder;
    use std::io::Cursor;

    fn parse(bytes: Vec<u8>) -> ParseResult<XRefTable> {
        XRefTable::parse(
            &mut Cursor::new(bytes),
            &ParseOptions::default(),
            &FilterRegistry::default(),
        )
    }

    #[test]
    fn test_find_startxref() {
        let data = b"%PDF-1.4\n...\nstartxref\n1234\n%%EOF\n".to_vec();
        assert_eq!(
            XRefTable::find_startxref(&mut Cursor::new(data)).unwrap(),
            1234
        );

        let missing = b"%PDF-1.4\nno index here\n%%EOF".to_vec();
        assert!(matches!(
            XRefTable::find_startxref(&mut Cursor::new(missing)),
            Err(ParseError::MalformedIndex(_))
        ));
    }

    #[test]
    fn test_parse_simple_table() {
        let mut builder = PdfBuilder::new();
        builder.object(1, "<< /Type /Catalog /Pages 2 0 R >>");
        builder.object(2, "<< /Type /Pages /Kids [] /Count 0 >>");
        let (bytes, offsets) = builder.build_with_offsets("/Root 1 0 R");

        let table = parse(bytes).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.get_entry(2),
            Some(&XRefEntry::InUse {
                offset: offsets[&2],
                generation: 0
            })
        );
        assert!(!table.get_entry(0).unwrap().is_in_use());
        assert_eq!(
            table.trailer().get_reference("Root"),
            Some(ObjectId::new(1, 0))
        );
        assert_eq!(table.section_count(), 1);
    }

    #[test]
    fn test_prev_chain_newest_wins() {
        let mut builder = PdfBuilder::new();
        builder.object(1, "<< /Type /Catalog /Pages 2 0 R >>");
        builder.object(2, "<< /Type /Pages /Kids [] /Count 0 >>");
        builder.object(3, "(old)");
        builder.finish_section("/Root 1 0 R");
        builder.object(3, "(new)");
        builder.object(4, "(added)");
        let (bytes, offsets) = builder.build_with_offsets("/Root 1 0 R");

        let table = parse(bytes).unwrap();
        assert_eq!(table.section_count(), 2);
        assert_eq!(
            table.get_entry(3),
            Some(&XRefEntry::InUse {
                offset: offsets[&3],
                generation: 0
            })
        );
        assert!(table.get_entry(1).is_some());
        assert!(table.get_entry(4).is_some());
        assert!(!table.trailer().contains_key("Prev"));
    }

    #[test]
    fn test_offset_beyond_file_is_malformed() {
        let mut bytes = b"%PDF-1.4\n".to_vec();
        bytes.extend_from_slice(b"startxref\n999999\n%%EOF\n");
        assert!(matches!(parse(bytes), Err(ParseError::MalformedIndex(_))));
    }

    #[test]
    fn test_missing_root_is_malformed() {
        let mut builder = PdfBuilder::new();
        builder.object(1, "<< >>");
        let bytes = builder.build("/Size 2");
        assert!(matches!(parse(bytes), Err(ParseError::MalformedIndex(_))));
    }

    #[test]
    fn test_off_by_one_subsection_is_fixed() {
        let body = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\n";
        let xref_at = body.len();
        let mut bytes = body.to_vec();
        bytes.extend_from_slice(
            b"xref\n1 2\n0000000000 65535 f \n0000000009 00000 n \ntrailer\n<< /Size 2 /Root 1 0 R >>\n",
        );
        bytes.extend_from_slice(format!("startxref\n{xref_at}\n%%EOF\n").as_bytes());

        let table = parse(bytes).unwrap();
        assert_eq!(
            table.get_entry(1),
            Some(&XRefEntry::InUse {
                offset: 9,
                generation: 0
            })
        );
    }

    #[test]
    fn test_xref_stream_section() {
        let mut builder = PdfBuilder::new();
        builder.object(1, "<< /Type /Catalog /Pages 2 0 R >>");
        builder.object(2, "<< /Type /Pages /Kids [] /Count 0 >>");
        let (bytes, offsets) = builder.build_with_xref_stream("/Root 1 0 R");

        let table = parse(bytes).unwrap();
        assert_eq!(
            table.get_entry(2),
            Some(&XRefEntry::InUse {
                offset: offsets[&2],
                generation: 0
            })
        );
        assert_eq!(
            table.trailer().get_reference("Root"),
            Some(ObjectId::new(1, 0))
        );
    }
}
