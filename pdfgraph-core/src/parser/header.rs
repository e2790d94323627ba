//! PDF Header Parser
//!
//! Parses PDF header and version according to ISO 32000-1 Section 7.5.2

use super::{ParseError, ParseResult};
use std::io::Read;
use tracing::warn;

/// Bytes searched for `%PDF-` when the file carries leading junk.
const HEADER_SEARCH_WINDOW: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PdfVersion {
    pub major: u8,
    pub minor: u8,
}

impl PdfVersion {
    pub fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// PDF 1.0 through 2.0
    pub fn is_supported(&self) -> bool {
        matches!((self.major, self.minor), (1, 0..=7) | (2, 0))
    }

    /// Parse "1.7" style strings.
    pub fn parse(text: &str) -> Option<Self> {
        let (major, minor) = text.trim().split_once('.')?;
        let minor: String = minor.chars().take_while(|c| c.is_ascii_digit()).collect();
        Some(Self::new(major.parse().ok()?, minor.parse().ok()?))
    }
}

impl Default for PdfVersion {
    fn default() -> Self {
        Self::new(1, 7)
    }
}

impl std::fmt::Display for PdfVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfHeader {
    pub version: PdfVersion,
    /// Where `%PDF-` starts. Non-zero when junk precedes the header;
    /// stored offsets are then usually relative to this point.
    pub offset: usize,
    pub has_binary_marker: bool,
}

impl PdfHeader {
    pub fn parse<R: Read>(reader: R) -> ParseResult<Self> {
        let mut head = Vec::with_capacity(HEADER_SEARCH_WINDOW);
        reader
            .take(HEADER_SEARCH_WINDOW as u64)
            .read_to_end(&mut head)?;
        Self::parse_bytes(&head)
    }

    pub fn parse_bytes(head: &[u8]) -> ParseResult<Self> {
        if head.is_empty() {
            return Err(ParseError::EmptyFile);
        }

        let window = &head[..head.len().min(HEADER_SEARCH_WINDOW)];
        let offset = window
            .windows(5)
            .position(|w| w == b"%PDF-")
            .ok_or(ParseError::InvalidHeader)?;
        if offset > 0 {
            warn!("{} bytes of junk before the PDF header", offset);
        }

        let line_start = offset + 5;
        let line_end = window[line_start..]
            .iter()
            .position(|&b| b == b'\n' || b == b'\r')
            .map(|p| line_start + p)
            .unwrap_or(window.len());
        let version_text = String::from_utf8_lossy(&window[line_start..line_end]);
        let version = PdfVersion::parse(&version_text).ok_or(ParseError::InvalidHeader)?;

        if !version.is_supported() {
            return Err(ParseError::UnsupportedVersion(version.to_string()));
        }

        // Binary marker: a comment line with at least four bytes >= 128
        let rest = &window[line_end..];
        let has_binary_marker = rest
            .iter()
            .position(|&b| b == b'%')
            .filter(|&p| rest[..p].iter().all(|b| b.is_ascii_whitespace()))
            .map(|p| rest[p + 1..].iter().take(4).filter(|&&b| b >= 128).count() >= 4)
            .unwrap_or(false);

        Ok(PdfHeader {
            version,
            offset,
            has_binary_marker,
        })
    }
}
