//! Low-level PDF Reader
//!
//! Owns the byte source and the cross-reference index and turns object
//! ids into freshly parsed [`Object`] values. Caching by identity happens
//! one level up, in [`PdfDocument`](super::PdfDocument).

use super::filters::FilterRegistry;
use super::header::{PdfHeader, PdfVersion};
use super::lexer::Lexer;
use super::object_stream::ObjectStream;
use super::objects::ObjectParser;
use super::trailer::PdfTrailer;
use super::xref::{XRefEntry, XRefTable};
use super::{ParseError, ParseOptions, ParseResult};
use crate::objects::{Object, ObjectId};
use crate::recovery::recover_xref;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, warn};

/// PDF reader over a seekable byte source
pub struct PdfReader<R: Read + Seek> {
    reader: BufReader<R>,
    header: PdfHeader,
    xref: XRefTable,
    trailer: PdfTrailer,
    /// Decoded object streams by container number
    object_stream_cache: HashMap<u32, ObjectStream>,
    /// Objects currently being parsed; breaks Length/container loops
    loading: HashSet<u32>,
    /// Index rebuilt by scanning, built the first time an indexed offset
    /// turns out to be wrong. `Some(None)` records a failed scan.
    scanned: Option<Option<XRefTable>>,
    options: ParseOptions,
    filters: FilterRegistry,
}

impl PdfReader<File> {
    /// Open a PDF file with lenient parsing and recovery enabled
    pub fn open<P: AsRef<Path>>(path: P) -> ParseResult<Self> {
        let file = File::open(path)?;
        Self::new_with_options(file, ParseOptions::lenient())
    }

    /// Open a PDF file with strict parsing and no recovery
    pub fn open_strict<P: AsRef<Path>>(path: P) -> ParseResult<Self> {
        let file = File::open(path)?;
        Self::new_with_options(file, ParseOptions::strict())
    }
}

impl<R: Read + Seek> PdfReader<R> {
    pub fn new(reader: R) -> ParseResult<Self> {
        Self::new_with_options(reader, ParseOptions::default())
    }

    pub fn new_with_options(reader: R, options: ParseOptions) -> ParseResult<Self> {
        Self::new_with_filters(reader, options, FilterRegistry::default())
    }

    /// Build a reader with a custom set of stream decoders.
    pub fn new_with_filters(
        reader: R,
        options: ParseOptions,
        filters: FilterRegistry,
    ) -> ParseResult<Self> {
        let mut buf_reader = BufReader::new(reader);

        let file_size = buf_reader.seek(SeekFrom::End(0))?;
        if file_size == 0 {
            return Err(ParseError::EmptyFile);
        }
        buf_reader.seek(SeekFrom::Start(0))?;
        let header = PdfHeader::parse(&mut buf_reader)?;

        let xref = match XRefTable::parse(&mut buf_reader, &options, &filters) {
            Ok(xref) => xref,
            Err(e) if options.recover_xref => {
                warn!("Cross-reference index unusable ({}), scanning file", e);
                let data = read_all(&mut buf_reader)?;
                recover_xref(&data, &options, &filters)?
            }
            Err(e) => return Err(e),
        };

        let trailer = PdfTrailer::new(xref.trailer().clone());
        trailer.validate()?;
        if trailer.is_encrypted() {
            warn!("Document is encrypted; strings and streams are read as stored");
        }
        debug!(
            "Opened PDF {} with {} xref entries",
            header.version,
            xref.len()
        );

        Ok(Self {
            reader: buf_reader,
            header,
            xref,
            trailer,
            object_stream_cache: HashMap::new(),
            loading: HashSet::new(),
            scanned: None,
            options,
            filters,
        })
    }

    pub fn version(&self) -> PdfVersion {
        self.header.version
    }

    pub fn header(&self) -> &PdfHeader {
        &self.header
    }

    pub fn trailer(&self) -> &PdfTrailer {
        &self.trailer
    }

    pub fn xref(&self) -> &XRefTable {
        &self.xref
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    /// Whether the index was rebuilt by scanning at open time.
    pub fn is_recovered(&self) -> bool {
        self.xref.is_recovered()
    }

    /// Parse the object `id` from the file.
    ///
    /// `Ok(None)` means the reference is dangling: no entry, a free entry,
    /// or a generation that does not match the index.
    pub fn load_object(&mut self, id: ObjectId) -> ParseResult<Option<Object>> {
        let Some(entry) = self.xref.get_entry(id.number()).copied() else {
            debug!("No xref entry for {}", id);
            return Ok(None);
        };
        if !entry.is_in_use() || entry.generation() != id.generation() {
            debug!("Reference {} does not match xref entry {:?}", id, entry);
            return Ok(None);
        }

        if !self.loading.insert(id.number()) {
            warn!("Object {} refers to itself while loading", id);
            return Ok(None);
        }
        let result = match entry {
            XRefEntry::InUse { offset, .. } => self.load_uncompressed(id, offset),
            XRefEntry::Compressed {
                stream_number,
                index,
            } => self.load_compressed(id, stream_number, index),
            XRefEntry::Free { .. } => Ok(None),
        };
        self.loading.remove(&id.number());

        let mut object = match result {
            Ok(object) => object,
            Err(e) if self.options.lenient_syntax => {
                warn!("Object {} is unreadable, treating as null: {}", id, e);
                None
            }
            Err(e) => return Err(e),
        };
        if let Some(Object::Stream(_)) = &object {
            self.fix_stream_length(&mut object);
        }
        Ok(object)
    }

    fn load_uncompressed(&mut self, id: ObjectId, offset: u64) -> ParseResult<Option<Object>> {
        let first_error = match self.parse_at(offset) {
            Ok((found, object)) if found == id => return Ok(Some(object)),
            Ok((found, _)) => ParseError::SyntaxError {
                position: offset as usize,
                message: format!("expected object {id}, found {found}"),
            },
            Err(e) => e,
        };

        // Junk before the header usually shifts every stored offset
        if self.header.offset > 0 {
            let shifted = offset + self.header.offset as u64;
            if let Ok((found, object)) = self.parse_at(shifted) {
                if found == id {
                    return Ok(Some(object));
                }
            }
        }

        if !self.options.recover_xref {
            return Err(first_error);
        }
        warn!(
            "Object {} not at indexed offset {} ({}), consulting scan",
            id, offset, first_error
        );
        match self.scanned_entry(id.number()) {
            Some(XRefEntry::InUse {
                offset: scanned,
                generation,
            }) if scanned != offset && generation == id.generation() => {
                let (found, object) = self.parse_at(scanned)?;
                if found == id {
                    Ok(Some(object))
                } else {
                    Err(first_error)
                }
            }
            _ => Err(first_error),
        }
    }

    fn load_compressed(
        &mut self,
        id: ObjectId,
        stream_number: u32,
        index: u32,
    ) -> ParseResult<Option<Object>> {
        if !self.object_stream_cache.contains_key(&stream_number) {
            let container = self.load_object(ObjectId::new(stream_number, 0))?;
            let stream = match container {
                Some(Object::Stream(stream)) => stream,
                other => {
                    return Err(ParseError::SyntaxError {
                        position: 0,
                        message: format!(
                            "object stream {stream_number} for {id} is {}",
                            other.as_ref().map_or("missing", Object::type_name)
                        ),
                    })
                }
            };
            let objstm = ObjectStream::parse(&stream, &self.filters, &self.options)?;
            debug!("Parsed object stream {} ({} objects)", stream_number, objstm.len());
            self.object_stream_cache.insert(stream_number, objstm);
        }

        Ok(self
            .object_stream_cache
            .get(&stream_number)
            .and_then(|objstm| objstm.get(id.number(), index))
            .cloned())
    }

    fn parse_at(&mut self, offset: u64) -> ParseResult<(ObjectId, Object)> {
        self.reader.seek(SeekFrom::Start(offset))?;
        let mut lexer = Lexer::with_offset(&mut self.reader, offset as usize);
        ObjectParser::new(&mut lexer, &self.options).parse_indirect_object()
    }

    /// Streams whose `/Length` is indirect were read up to `endstream`;
    /// cut them to the resolved length when it is plausible.
    fn fix_stream_length(&mut self, object: &mut Option<Object>) {
        let Some(Object::Stream(stream)) = object else {
            return;
        };
        let Some(length_id) = stream.dictionary().get_reference("Length") else {
            return;
        };
        let length = match self.load_object(length_id) {
            Ok(Some(Object::Integer(n))) if n >= 0 => n as usize,
            _ => {
                warn!("Stream /Length {} does not resolve to a length", length_id);
                let actual = stream.data().len() as i64;
                stream.dictionary_mut().set("Length", actual);
                return;
            }
        };
        if length <= stream.data().len() {
            let mut data = stream.data().to_vec();
            data.truncate(length);
            stream.set_data(data);
        } else {
            warn!(
                "Stream /Length {} exceeds the {} bytes before endstream",
                length,
                stream.data().len()
            );
            let actual = stream.data().len() as i64;
            stream.dictionary_mut().set("Length", actual);
        }
    }

    fn scanned_entry(&mut self, number: u32) -> Option<XRefEntry> {
        if self.scanned.is_none() {
            let table = read_all(&mut self.reader)
                .and_then(|data| recover_xref(&data, &self.options, &self.filters));
            self.scanned = Some(match table {
                Ok(table) => Some(table),
                Err(e) => {
                    warn!("Recovery scan failed: {}", e);
                    None
                }
            });
        }
        self.scanned
            .as_ref()
            .and_then(Option::as_ref)
            .and_then(|table| table.get_entry(number).copied())
    }

    /// Hand the reader to a [`PdfDocument`](super::PdfDocument).
    pub fn into_document(self) -> super::PdfDocument<R> {
        super::PdfDocument::new(self)
    }
}

fn read_all<R: Read + Seek>(reader: &mut R) -> ParseResult<Vec<u8>> {
    reader.seek(SeekFrom::Start(0))?;
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    Ok(data)
}
