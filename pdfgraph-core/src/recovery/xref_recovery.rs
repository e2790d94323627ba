//! XRef recovery for damaged PDF files
//!
//! Rebuilds the cross-reference index by scanning the whole file for
//! `N G obj` headers when the stored index is missing or unusable.

use crate::objects::{Dictionary, Object, ObjectId};
use crate::parser::filters::FilterRegistry;
use crate::parser::lexer::Lexer;
use crate::parser::object_stream::ObjectStream;
use crate::parser::objects::{parse_object_from_bytes, ObjectParser};
use crate::parser::xref::{XRefEntry, XRefTable};
use crate::parser::{ParseError, ParseOptions, ParseResult};
use std::collections::BTreeMap;
use std::io::Cursor;
use tracing::{debug, warn};

/// Recovery statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryStats {
    /// `N G obj` headers found
    pub objects_found: usize,
    /// Entries pointing into object streams
    pub compressed_found: usize,
    /// Objects whose body could not be parsed
    pub errors: usize,
    /// Whether a `trailer` dictionary or xref stream supplied the trailer
    pub trailer_found: bool,
}

/// XRef recovery engine
pub struct XRefRecovery<'a> {
    data: &'a [u8],
    options: &'a ParseOptions,
    filters: &'a FilterRegistry,
    /// number -> (generation, offset); later definitions replace earlier ones
    objects: BTreeMap<u32, (u16, u64)>,
    compressed: BTreeMap<u32, (u32, u32)>,
    catalog: Option<ObjectId>,
    stream_trailer: Option<Dictionary>,
    stats: RecoveryStats,
}

impl<'a> XRefRecovery<'a> {
    pub fn new(data: &'a [u8], options: &'a ParseOptions, filters: &'a FilterRegistry) -> Self {
        Self {
            data,
            options,
            filters,
            objects: BTreeMap::new(),
            compressed: BTreeMap::new(),
            catalog: None,
            stream_trailer: None,
            stats: RecoveryStats::default(),
        }
    }

    pub fn stats(&self) -> &RecoveryStats {
        &self.stats
    }

    /// Scan the file and build a table from what was found.
    pub fn recover(&mut self) -> ParseResult<XRefTable> {
        self.scan_headers();
        self.inspect_objects();

        let mut table = XRefTable::new();
        for (&number, &(stream_number, index)) in &self.compressed {
            table.insert(
                number,
                XRefEntry::Compressed {
                    stream_number,
                    index,
                },
            );
        }
        // Objects written directly override copies inside object streams
        for (&number, &(generation, offset)) in &self.objects {
            table.insert(number, XRefEntry::InUse { offset, generation });
        }

        let trailer = self.build_trailer(table.max_object_number())?;
        table.set_trailer(trailer);
        table.mark_recovered();

        debug!(
            "Recovered {} xref entries ({} in object streams)",
            table.len(),
            self.stats.compressed_found
        );
        Ok(table)
    }

    fn scan_headers(&mut self) {
        let data = self.data;
        let mut pos = 0;
        while let Some(found) = find(&data[pos..], b"obj") {
            let at = pos + found;
            pos = at + 3;

            // "obj" must stand alone, not be part of "endobj" or "objx"
            if data.get(at + 3).is_some_and(|&b| is_regular(b)) {
                continue;
            }
            if let Some((number, generation, start)) = parse_object_header(data, at) {
                self.objects.insert(number, (generation, start as u64));
                self.stats.objects_found += 1;
            }
        }
    }

    /// Parse every scanned object once to find the catalog, xref streams
    /// and object stream members.
    fn inspect_objects(&mut self) {
        let located: Vec<(u32, u64)> = self
            .objects
            .iter()
            .map(|(&number, &(_, offset))| (number, offset))
            .collect();

        for (number, offset) in located {
            let (id, object) = match self.parse_at(offset) {
                Ok(parsed) => parsed,
                Err(e) => {
                    debug!("Scanned object {} at {} is unreadable: {}", number, offset, e);
                    self.stats.errors += 1;
                    continue;
                }
            };

            match object.as_dict().and_then(|d| d.get_type()) {
                Some("Catalog") => self.catalog = Some(id),
                Some("XRef") => {
                    if let Some(dict) = object.as_dict() {
                        if dict.contains_key("Root") {
                            self.stream_trailer = Some(dict.clone());
                        }
                    }
                }
                Some("ObjStm") => {
                    if let Object::Stream(stream) = &object {
                        match ObjectStream::parse(stream, self.filters, self.options) {
                            Ok(objstm) => self.register_members(number, &objstm),
                            Err(e) => {
                                warn!("Object stream {} is unreadable: {}", number, e);
                                self.stats.errors += 1;
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn register_members(&mut self, stream_number: u32, objstm: &ObjectStream) {
        for (slot, member) in objstm.object_numbers().enumerate() {
            self.compressed.insert(member, (stream_number, slot as u32));
            self.stats.compressed_found += 1;

            let is_catalog = objstm
                .get(member, slot as u32)
                .and_then(Object::as_dict)
                .and_then(Dictionary::get_type)
                == Some("Catalog");
            if is_catalog && self.catalog.is_none() {
                self.catalog = Some(ObjectId::new(member, 0));
            }
        }
    }

    fn parse_at(&self, offset: u64) -> ParseResult<(ObjectId, Object)> {
        let mut cursor = Cursor::new(self.data);
        cursor.set_position(offset);
        let mut lexer = Lexer::with_offset(cursor, offset as usize);
        ObjectParser::new(&mut lexer, self.options).parse_indirect_object()
    }

    /// Last `trailer` dictionary naming a root, then the last xref stream
    /// dictionary, then a synthesized one pointing at the scanned catalog.
    fn build_trailer(&mut self, max_number: u32) -> ParseResult<Dictionary> {
        let mut trailer = match self.find_trailer_dict().or_else(|| self.stream_trailer.take()) {
            Some(dict) => {
                self.stats.trailer_found = true;
                dict
            }
            None => {
                let root = self.catalog.ok_or_else(|| {
                    ParseError::MalformedIndex(
                        "no trailer and no catalog found while scanning".to_string(),
                    )
                })?;
                warn!("No trailer found, using scanned catalog {}", root);
                let mut dict = Dictionary::new();
                dict.set("Root", root);
                dict
            }
        };

        for key in ["Prev", "XRefStm", "Type", "W", "Index", "Length", "Filter", "DecodeParms"] {
            trailer.remove(key);
        }
        // A trailer whose root was not found points nowhere useful
        let root_known = trailer.get_reference("Root").is_some_and(|root| {
            self.objects.contains_key(&root.number())
                || self.compressed.contains_key(&root.number())
        });
        if !root_known {
            if let Some(catalog) = self.catalog {
                trailer.set("Root", catalog);
            }
        }
        trailer.set("Size", i64::from(max_number) + 1);
        Ok(trailer)
    }

    fn find_trailer_dict(&self) -> Option<Dictionary> {
        let data = self.data;
        let mut end = data.len();
        while let Some(at) = rfind(&data[..end], b"trailer") {
            end = at;
            let body = &data[at + b"trailer".len()..];
            match parse_object_from_bytes(body, self.options) {
                Ok(Object::Dictionary(dict)) if dict.contains_key("Root") => return Some(dict),
                Ok(_) => continue,
                Err(e) => debug!("Unreadable trailer at {}: {}", at, e),
            }
        }
        None
    }
}

/// Rebuild the index of `data` by scanning.
pub fn recover_xref(
    data: &[u8],
    options: &ParseOptions,
    filters: &FilterRegistry,
) -> ParseResult<XRefTable> {
    XRefRecovery::new(data, options, filters).recover()
}

/// Walk back from the `obj` keyword at `at` over `N G` and return the
/// numbers plus the offset of `N`.
fn parse_object_header(data: &[u8], at: usize) -> Option<(u32, u16, usize)> {
    let mut pos = at;
    pos = skip_back_whitespace(data, pos, true)?;
    let (generation, gen_start) = read_back_digits(data, pos)?;
    pos = skip_back_whitespace(data, gen_start, true)?;
    let (number, num_start) = read_back_digits(data, pos)?;

    // The number must start a token
    if num_start > 0 && is_regular(data[num_start - 1]) {
        return None;
    }
    let generation = u16::try_from(generation).ok()?;
    let number = u32::try_from(number).ok()?;
    Some((number, generation, num_start))
}

fn skip_back_whitespace(data: &[u8], mut pos: usize, required: bool) -> Option<usize> {
    let start = pos;
    while pos > 0 && data[pos - 1].is_ascii_whitespace() {
        pos -= 1;
    }
    (!required || pos < start).then_some(pos)
}

/// Digits ending right before `end`: (value, start offset).
fn read_back_digits(data: &[u8], end: usize) -> Option<(u64, usize)> {
    let mut start = end;
    while start > 0 && data[start - 1].is_ascii_digit() && end - start < 10 {
        start -= 1;
    }
    if start == end {
        return None;
    }
    let text = std::str::from_utf8(&data[start..end]).ok()?;
    Some((text.parse().ok()?, start))
}

/// Not whitespace and not a delimiter.
fn is_regular(byte: u8) -> bool {
    !byte.is_ascii_whitespace() && !b"()<>[]{}/%".contains(&byte) && byte != 0
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}
