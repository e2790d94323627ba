//! PDF Stream Filters
//!
//! Decoding of stream payloads according to ISO 32000-1 Section 7.4. Codecs
//! are looked up by filter name in a [`FilterRegistry`], so callers can add
//! or replace decoders without touching the object graph code.

use super::{ParseError, ParseResult};
use crate::objects::{Dictionary, Stream};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

#[cfg(feature = "compression")]
use flate2::read::ZlibDecoder;
#[cfg(feature = "compression")]
use std::io::Read;

/// Standard PDF filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    ASCIIHexDecode,
    ASCII85Decode,
    LZWDecode,
    FlateDecode,
    RunLengthDecode,
    CCITTFaxDecode,
    JBIG2Decode,
    DCTDecode,
    JPXDecode,
    Crypt,
}

impl Filter {
    /// Accepts full names and the inline-image abbreviations.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ASCIIHexDecode" | "AHx" => Some(Filter::ASCIIHexDecode),
            "ASCII85Decode" | "A85" => Some(Filter::ASCII85Decode),
            "LZWDecode" | "LZW" => Some(Filter::LZWDecode),
            "FlateDecode" | "Fl" => Some(Filter::FlateDecode),
            "RunLengthDecode" | "RL" => Some(Filter::RunLengthDecode),
            "CCITTFaxDecode" | "CCF" => Some(Filter::CCITTFaxDecode),
            "JBIG2Decode" => Some(Filter::JBIG2Decode),
            "DCTDecode" | "DCT" => Some(Filter::DCTDecode),
            "JPXDecode" => Some(Filter::JPXDecode),
            "Crypt" => Some(Filter::Crypt),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Filter::ASCIIHexDecode => "ASCIIHexDecode",
            Filter::ASCII85Decode => "ASCII85Decode",
            Filter::LZWDecode => "LZWDecode",
            Filter::FlateDecode => "FlateDecode",
            Filter::RunLengthDecode => "RunLengthDecode",
            Filter::CCITTFaxDecode => "CCITTFaxDecode",
            Filter::JBIG2Decode => "JBIG2Decode",
            Filter::DCTDecode => "DCTDecode",
            Filter::JPXDecode => "JPXDecode",
            Filter::Crypt => "Crypt",
        }
    }
}

/// A decoder: encoded bytes plus the filter's `/DecodeParms` entry.
pub type Decoder = Box<dyn Fn(&[u8], Option<&Dictionary>) -> ParseResult<Vec<u8>>>;

/// Name-keyed decoder table.
pub struct FilterRegistry {
    decoders: HashMap<String, Decoder>,
}

impl FilterRegistry {
    /// A registry with no decoders at all.
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Register (or replace) the decoder for `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, decoder: F)
    where
        F: Fn(&[u8], Option<&Dictionary>) -> ParseResult<Vec<u8>> + 'static,
    {
        self.decoders.insert(name.into(), Box::new(decoder));
    }

    pub fn supports(&self, name: &str) -> bool {
        self.decoders.contains_key(canonical(name))
    }

    /// Apply a single filter.
    pub fn decode(
        &self,
        name: &str,
        data: &[u8],
        params: Option<&Dictionary>,
    ) -> ParseResult<Vec<u8>> {
        let decoder = self
            .decoders
            .get(canonical(name))
            .ok_or_else(|| ParseError::UnsupportedFilter(name.to_string()))?;
        decoder(data, params)
    }

    /// Apply the stream's whole filter chain in order.
    pub fn decode_stream(&self, stream: &Stream) -> ParseResult<Vec<u8>> {
        let filters = stream.filters();
        if filters.is_empty() {
            return Ok(stream.data().to_vec());
        }

        let params = stream.decode_params();
        let mut result = stream.data().to_vec();
        for (index, name) in filters.iter().enumerate() {
            let parms = params.get(index).and_then(Option::as_ref);
            result = self.decode(name, &result, parms)?;
        }
        Ok(result)
    }

    /// Decode when possible, otherwise keep the payload as stored.
    pub fn decode_or_raw(&self, stream: &Stream) -> Vec<u8> {
        match self.decode_stream(stream) {
            Ok(data) => data,
            Err(e) => {
                warn!("Leaving stream payload undecoded: {}", e);
                stream.data().to_vec()
            }
        }
    }
}

fn canonical(name: &str) -> &str {
    Filter::from_name(name).map(|f| f.name()).unwrap_or(name)
}

impl Default for FilterRegistry {
    /// Flate (with predictors, when the `compression` feature is on),
    /// ASCIIHex, ASCII85 and RunLength.
    fn default() -> Self {
        let mut registry = Self::empty();
        #[cfg(feature = "compression")]
        registry.register(Filter::FlateDecode.name(), |data, params| {
            let inflated = decode_flate(data)?;
            match params {
                Some(params) => apply_predictor(&inflated, params),
                None => Ok(inflated),
            }
        });
        registry.register(Filter::ASCIIHexDecode.name(), |data, _| {
            decode_ascii_hex(data)
        });
        registry.register(Filter::ASCII85Decode.name(), |data, _| decode_ascii85(data));
        registry.register(Filter::RunLengthDecode.name(), |data, _| {
            decode_run_length(data)
        });
        registry
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.decoders.keys().collect();
        names.sort();
        f.debug_struct("FilterRegistry")
            .field("decoders", &names)
            .finish()
    }
}

/// Decode FlateDecode (zlib) data. A truncated stream yields whatever was
/// inflated before the damage.
#[cfg(feature = "compression")]
pub fn decode_flate(data: &[u8]) -> ParseResult<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut result = Vec::new();
    match decoder.read_to_end(&mut result) {
        Ok(_) => Ok(result),
        Err(e) if !result.is_empty() => {
            warn!("Flate stream damaged after {} bytes: {}", result.len(), e);
            Ok(result)
        }
        Err(e) => Err(ParseError::StreamDecodeError(format!(
            "Flate decode error: {e}"
        ))),
    }
}

/// Undo PNG (10..=15) and TIFF (2) predictors described by `/DecodeParms`.
pub fn apply_predictor(data: &[u8], params: &Dictionary) -> ParseResult<Vec<u8>> {
    let predictor = params.get_integer("Predictor").unwrap_or(1);
    if predictor <= 1 {
        return Ok(data.to_vec());
    }

    let colors = params.get_integer("Colors").unwrap_or(1).max(1) as usize;
    let bits = params.get_integer("BitsPerComponent").unwrap_or(8).max(1) as usize;
    let columns = params.get_integer("Columns").unwrap_or(1).max(1) as usize;
    let bytes_per_pixel = (colors * bits).div_ceil(8).max(1);
    let row_len = (colors * bits * columns).div_ceil(8);

    match predictor {
        2 => decode_tiff_predictor(data, row_len, bytes_per_pixel, bits),
        10..=15 => decode_png_predictor(data, row_len, bytes_per_pixel),
        other => Err(ParseError::StreamDecodeError(format!(
            "Unknown predictor {other}"
        ))),
    }
}

fn decode_png_predictor(data: &[u8], row_len: usize, bpp: usize) -> ParseResult<Vec<u8>> {
    let mut output = Vec::with_capacity(data.len());
    let mut previous = vec![0u8; row_len];

    for chunk in data.chunks(row_len + 1) {
        let filter_type = chunk[0];
        let mut row = chunk[1..].to_vec();
        row.resize(row_len, 0);

        for i in 0..row_len {
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let up = previous[i];
            let up_left = if i >= bpp { previous[i - bpp] } else { 0 };
            row[i] = match filter_type {
                0 => row[i],
                1 => row[i].wrapping_add(left),
                2 => row[i].wrapping_add(up),
                3 => row[i].wrapping_add(((left as u16 + up as u16) / 2) as u8),
                4 => row[i].wrapping_add(paeth(left, up, up_left)),
                other => {
                    return Err(ParseError::StreamDecodeError(format!(
                        "Invalid PNG row filter {other}"
                    )))
                }
            };
        }

        output.extend_from_slice(&row);
        previous = row;
    }

    Ok(output)
}

fn paeth(left: u8, up: u8, up_left: u8) -> u8 {
    let p = left as i16 + up as i16 - up_left as i16;
    let pa = (p - left as i16).abs();
    let pb = (p - up as i16).abs();
    let pc = (p - up_left as i16).abs();
    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        up
    } else {
        up_left
    }
}

fn decode_tiff_predictor(
    data: &[u8],
    row_len: usize,
    bpp: usize,
    bits: usize,
) -> ParseResult<Vec<u8>> {
    if bits != 8 {
        return Err(ParseError::StreamDecodeError(format!(
            "TIFF predictor with {bits} bits per component"
        )));
    }
    let mut output = data.to_vec();
    for row in output.chunks_mut(row_len) {
        for i in bpp..row.len() {
            row[i] = row[i].wrapping_add(row[i - bpp]);
        }
    }
    Ok(output)
}

pub fn decode_ascii_hex(data: &[u8]) -> ParseResult<Vec<u8>> {
    let mut result = Vec::new();
    let mut pending: Option<u8> = None;

    for &ch in data {
        if ch == b'>' {
            break;
        }
        if ch.is_ascii_whitespace() {
            continue;
        }
        let value = hex_digit_value(ch).ok_or_else(|| {
            ParseError::StreamDecodeError(format!("Invalid hex digit: {}", ch as char))
        })?;
        match pending.take() {
            Some(high) => result.push((high << 4) | value),
            None => pending = Some(value),
        }
    }

    // Odd digit count: missing low nibble is 0
    if let Some(high) = pending {
        result.push(high << 4);
    }

    Ok(result)
}

fn hex_digit_value(ch: u8) -> Option<u8> {
    match ch {
        b'0'..=b'9' => Some(ch - b'0'),
        b'A'..=b'F' => Some(ch - b'A' + 10),
        b'a'..=b'f' => Some(ch - b'a' + 10),
        _ => None,
    }
}

pub fn decode_ascii85(data: &[u8]) -> ParseResult<Vec<u8>> {
    let mut body: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if body.starts_with(b"<~") {
        body.drain(..2);
    }
    if let Some(end) = body.windows(2).position(|w| w == b"~>") {
        body.truncate(end);
    }

    let mut result = Vec::with_capacity(body.len() * 4 / 5);
    let mut group = Vec::with_capacity(5);

    for &c in &body {
        match c {
            b'z' if group.is_empty() => result.extend_from_slice(&[0, 0, 0, 0]),
            b'!'..=b'u' => {
                group.push(c);
                if group.len() == 5 {
                    result.extend_from_slice(&ascii85_group(&group)?.to_be_bytes());
                    group.clear();
                }
            }
            _ => {
                return Err(ParseError::StreamDecodeError(format!(
                    "Invalid ASCII85 character: {}",
                    c as char
                )))
            }
        }
    }

    if !group.is_empty() {
        let used = group.len();
        if used == 1 {
            return Err(ParseError::StreamDecodeError(
                "ASCII85 final group has a single character".to_string(),
            ));
        }
        group.resize(5, b'u');
        let bytes = ascii85_group(&group)?.to_be_bytes();
        result.extend_from_slice(&bytes[..used - 1]);
    }

    Ok(result)
}

fn ascii85_group(group: &[u8]) -> ParseResult<u32> {
    let value = group
        .iter()
        .fold(0u64, |acc, &ch| acc * 85 + (ch - b'!') as u64);
    u32::try_from(value)
        .map_err(|_| ParseError::StreamDecodeError("ASCII85 group overflows".to_string()))
}

pub fn decode_run_length(data: &[u8]) -> ParseResult<Vec<u8>> {
    let mut result = Vec::new();
    let mut i = 0;

    while i < data.len() {
        let length = data[i];
        i += 1;
        match length {
            128 => break,
            0..=127 => {
                let count = length as usize + 1;
                let end = (i + count).min(data.len());
                result.extend_from_slice(&data[i..end]);
                i = end;
            }
            _ => {
                let byte = *data.get(i).ok_or_else(|| {
                    ParseError::StreamDecodeError("RunLength run without byte".to_string())
                })?;
                result.extend(std::iter::repeat(byte).take(257 - length as usize));
                i += 1;
            }
        }
    }

    Ok(result)
}
