use crate::parser::ParseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// The byte sink refused a write. Carries the sink's own error.
    #[error("Write to output sink failed: {0}")]
    SinkWrite(#[source] std::io::Error),

    #[error("Invalid PDF structure: {0}")]
    InvalidStructure(String),

    #[error("Compression error: {0}")]
    CompressionError(String),

    #[error("Invalid page number: {0}")]
    InvalidPageNumber(u32),
}

pub type Result<T> = std::result::Result<T, PdfError>;

impl PdfError {
    /// Underlying sink error, when this is a write failure.
    pub fn sink_error(&self) -> Option<&std::io::Error> {
        match self {
            PdfError::SinkWrite(err) => Some(err),
            _ => None,
        }
    }
}
