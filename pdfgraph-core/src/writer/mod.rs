//! Serialization of an object graph into a fresh, self-contained file
//!
//! The writer takes a set of pages (and optionally a form), renumbers
//! everything reachable from them and writes each object exactly once,
//! followed by a single cross-reference table and trailer.

mod graph;
mod pdf_writer;
mod serializer;

pub use pdf_writer::{PdfWriter, WriterConfig};
pub use serializer::serialize;

use crate::error::Result;
use crate::forms::AcroForm;
use crate::objects::ObjectResolver;
use crate::page::Page;
use std::path::Path;

/// Write `pages` and `form` to a new file at `path`.
pub fn write_to_file(
    path: impl AsRef<Path>,
    resolver: &dyn ObjectResolver,
    pages: &[Page],
    form: Option<&AcroForm>,
    config: WriterConfig,
) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = PdfWriter::with_config(std::io::BufWriter::new(file), config);
    writer.write_pages(resolver, pages, form)
}
