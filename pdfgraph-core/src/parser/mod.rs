//! PDF Parser Module
//!
//! Reads the object graph of a PDF file: header, cross-reference index
//! (tables, streams and `/Prev` chains), trailer and lazily loaded
//! indirect objects, following ISO 32000-1 Section 7.

pub mod document;
pub mod filters;
pub mod header;
pub mod lexer;
pub mod object_stream;
pub mod objects;
pub mod page_tree;
pub mod reader;
pub mod trailer;
pub mod xref;
pub mod xref_stream;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use self::document::PdfDocument;
pub use self::filters::{Filter, FilterRegistry};
pub use self::objects::{parse_object_from_bytes, ObjectParser};
pub use self::reader::PdfReader;
pub use self::xref::{XRefEntry, XRefTable};

/// Result type for parser operations
pub type ParseResult<T> = Result<T, ParseError>;

/// PDF Parser errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Empty file")]
    EmptyFile,

    #[error("Invalid PDF header")]
    InvalidHeader,

    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    #[error("Syntax error at position {position}: {message}")]
    SyntaxError { position: usize, message: String },

    #[error("Unexpected token: expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },

    #[error("Missing required key: {0}")]
    MissingKey(String),

    /// Cross-reference data is absent, unparsable or inconsistent.
    #[error("Malformed cross-reference index: {0}")]
    MalformedIndex(String),

    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    #[error("Stream decode error: {0}")]
    StreamDecodeError(String),

    #[error("Invalid object reference: {0} {1} R")]
    InvalidReference(u32, u16),
}

/// Parsing behaviour knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Accept common syntax damage (wrong stream lengths, missing
    /// `endobj`, values missing before `>>`) with a warning.
    pub lenient_syntax: bool,
    /// Rebuild the cross-reference index by scanning the file when the
    /// stored one cannot be used.
    pub recover_xref: bool,
    /// Upper bound on `/Prev` hops, guards against looping chains.
    pub max_xref_sections: usize,
    /// Upper bound on array/dictionary nesting inside one object.
    pub max_recursion_depth: usize,
}

impl ParseOptions {
    pub fn strict() -> Self {
        Self {
            lenient_syntax: false,
            recover_xref: false,
            max_xref_sections: 64,
            max_recursion_depth: 500,
        }
    }

    pub fn lenient() -> Self {
        Self {
            lenient_syntax: true,
            recover_xref: true,
            max_xref_sections: 256,
            max_recursion_depth: 500,
        }
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::lenient()
    }
}
