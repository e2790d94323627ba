//! PDF Trailer
//!
//! Typed access to the merged trailer dictionary (ISO 32000-1 Section 7.5.5)

use super::{ParseError, ParseResult};
use crate::objects::{Dictionary, Object, ObjectId};

#[derive(Debug, Clone, PartialEq)]
pub struct PdfTrailer {
    dict: Dictionary,
}

impl PdfTrailer {
    pub fn new(dict: Dictionary) -> Self {
        Self { dict }
    }

    /// Number of xref entries claimed by the file.
    pub fn size(&self) -> ParseResult<u32> {
        self.dict
            .get_integer("Size")
            .map(|i| i.max(0) as u32)
            .ok_or_else(|| ParseError::MissingKey("Size".to_string()))
    }

    /// Reference to the document catalog.
    pub fn root(&self) -> ParseResult<ObjectId> {
        self.dict
            .get_reference("Root")
            .ok_or_else(|| ParseError::MissingKey("Root".to_string()))
    }

    pub fn info(&self) -> Option<ObjectId> {
        self.dict.get_reference("Info")
    }

    /// The `/ID` pair, when present.
    pub fn id(&self) -> Option<&Object> {
        self.dict.get("ID")
    }

    pub fn is_encrypted(&self) -> bool {
        self.dict.contains_key("Encrypt")
    }

    pub fn validate(&self) -> ParseResult<()> {
        self.root().map(|_| ())
    }

    pub fn dict(&self) -> &Dictionary {
        &self.dict
    }
}
