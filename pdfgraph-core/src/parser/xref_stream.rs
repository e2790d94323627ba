//! Cross-reference stream support for PDF 1.5+
//!
//! Decodes `/Type /XRef` streams according to ISO 32000-1:2008
//! Section 7.5.8. The stream dictionary doubles as the section's trailer.

use super::filters::FilterRegistry;
use super::xref::XRefEntry;
use super::{ParseError, ParseResult};
use crate::objects::{Dictionary, Stream};
use tracing::warn;

/// Keys that describe the stream itself rather than the document.
const STREAM_ONLY_KEYS: [&str; 7] = ["Type", "Length", "Filter", "DecodeParms", "W", "Index", "DL"];

/// A decoded cross-reference stream.
#[derive(Debug, Clone)]
pub struct XRefStream {
    widths: [usize; 3],
    index: Vec<(u32, u32)>,
    data: Vec<u8>,
    trailer: Dictionary,
}

impl XRefStream {
    pub fn parse(stream: &Stream, filters: &FilterRegistry) -> ParseResult<Self> {
        let dict = stream.dictionary();

        let widths: Vec<usize> = dict
            .get_array("W")
            .ok_or_else(|| ParseError::MissingKey("W array in xref stream".to_string()))?
            .iter()
            .map(|obj| match obj.as_integer() {
                Some(n) if (0..=8).contains(&n) => Ok(n as usize),
                _ => Err(ParseError::MalformedIndex(
                    "Invalid width in xref stream W array".to_string(),
                )),
            })
            .collect::<ParseResult<_>>()?;
        let widths: [usize; 3] = widths.try_into().map_err(|w: Vec<usize>| {
            ParseError::MalformedIndex(format!("W array must have 3 elements, found {}", w.len()))
        })?;

        let index = match dict.get_array("Index") {
            Some(items) => items
                .chunks(2)
                .filter_map(|pair| match pair {
                    [first, count] => Some((first.as_integer()?, count.as_integer()?)),
                    _ => None,
                })
                .map(|(first, count)| {
                    match (u32::try_from(first), u32::try_from(count)) {
                        (Ok(first), Ok(count)) => Ok((first, count)),
                        _ => Err(ParseError::MalformedIndex(format!(
                            "Index subsection {first} {count} out of range"
                        ))),
                    }
                })
                .collect::<ParseResult<_>>()?,
            None => {
                let size = dict
                    .get_integer("Size")
                    .ok_or_else(|| ParseError::MissingKey("Size in xref stream".to_string()))?;
                vec![(0, u32::try_from(size.max(0)).unwrap_or(u32::MAX))]
            }
        };

        let data = filters.decode_stream(stream)?;

        let mut trailer = dict.clone();
        for key in STREAM_ONLY_KEYS {
            trailer.remove(key);
        }

        Ok(Self {
            widths,
            index,
            data,
            trailer,
        })
    }

    /// Trailer entries carried by the stream dictionary (`Root`, `Prev`, ...).
    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    /// All entries in `/Index` order. A short payload ends the list early.
    pub fn entries(&self) -> Vec<(u32, XRefEntry)> {
        let row_len: usize = self.widths.iter().sum();
        let mut entries = Vec::new();
        if row_len == 0 {
            return entries;
        }

        let mut rows = self.data.chunks_exact(row_len);
        for &(first, count) in &self.index {
            for number in first..first.saturating_add(count) {
                let Some(row) = rows.next() else {
                    warn!(
                        "Xref stream data ends before object {} (declared {} entries from {})",
                        number, count, first
                    );
                    return entries;
                };
                if let Some(entry) = self.decode_row(number, row) {
                    entries.push((number, entry));
                }
            }
        }
        entries
    }

    fn decode_row(&self, number: u32, row: &[u8]) -> Option<XRefEntry> {
        let [w0, w1, w2] = self.widths;
        // A zero-width type field defaults to type 1
        let kind = if w0 == 0 { 1 } else { read_field(&row[..w0]) };
        let field2 = read_field(&row[w0..w0 + w1]);
        let field3 = read_field(&row[w0 + w1..w0 + w1 + w2]);

        match kind {
            0 => Some(XRefEntry::Free {
                next_free: field2 as u32,
                generation: field3 as u16,
            }),
            1 => Some(XRefEntry::InUse {
                offset: field2,
                generation: field3 as u16,
            }),
            2 => Some(XRefEntry::Compressed {
                stream_number: field2 as u32,
                index: field3 as u32,
            }),
            other => {
                warn!("Xref stream entry {} has unknown type {}, ignoring", number, other);
                None
            }
        }
    }
}

/// Big-endian unsigned integer of up to 8 bytes.
fn read_field(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}
