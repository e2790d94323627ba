use super::graph::{self, CATALOG_NUMBER, PAGES_NUMBER};
use super::serializer;
use crate::error::{PdfError, Result};
use crate::forms::AcroForm;
use crate::objects::{Dictionary, Object, ObjectId, ObjectResolver, PdfString};
use crate::page::Page;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, trace};

/// Output settings for [`PdfWriter`].
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Version written in the header, e.g. "1.7"
    pub pdf_version: String,
    /// Flate-compress streams that carry no filter yet
    pub compress_streams: bool,
    /// `/Producer` of the Info dictionary
    pub producer: String,
    /// Whether to write an Info dictionary at all
    pub write_info: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            pdf_version: "1.7".to_string(),
            compress_streams: false,
            producer: format!("pdfgraph {}", env!("CARGO_PKG_VERSION")),
            write_info: true,
        }
    }
}

/// Writes a complete document (header, objects, xref table, trailer) for
/// a set of pages and an optional form. Output always has a single, fresh
/// cross-reference section.
pub struct PdfWriter<W: Write> {
    writer: W,
    xref_positions: BTreeMap<u32, u64>,
    current_position: u64,
    config: WriterConfig,
}

impl<W: Write> PdfWriter<W> {
    pub fn new_with_writer(writer: W) -> Self {
        Self::with_config(writer, WriterConfig::default())
    }

    pub fn with_config(writer: W, config: WriterConfig) -> Self {
        Self {
            writer,
            xref_positions: BTreeMap::new(),
            current_position: 0,
            config,
        }
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    pub fn bytes_written(&self) -> u64 {
        self.current_position
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Write `pages`, everything reachable from them and, when given, the
    /// form and its field tree. The first error of the sink is returned as
    /// [`PdfError::SinkWrite`] and nothing more is written.
    pub fn write_pages(
        &mut self,
        resolver: &dyn ObjectResolver,
        pages: &[Page],
        form: Option<&AcroForm>,
    ) -> Result<()> {
        // Each call writes a complete document of its own
        self.xref_positions.clear();
        self.current_position = 0;

        let plan = graph::collect(resolver, pages, form);
        let info_number = self.config.write_info.then_some(plan.next_number);
        let size = plan.next_number + u32::from(info_number.is_some());
        let created = Utc::now();

        self.write_header()?;
        self.write_catalog(plan.form_number)?;
        self.write_page_tree(&plan.page_numbers)?;
        for (number, object) in &plan.objects {
            self.write_object(*number, object)?;
        }
        if let Some(number) = info_number {
            self.write_info(number, created)?;
        }

        let xref_position = self.current_position;
        let xref = self.xref_section(size);
        self.write_bytes(&xref)?;
        let file_id = document_id(&created, &xref);
        self.write_trailer(size, info_number, file_id, xref_position)?;

        self.writer.flush().map_err(PdfError::SinkWrite)?;
        debug!(
            "Wrote {} pages, {} objects, {} bytes",
            plan.page_numbers.len(),
            size - 1,
            self.current_position
        );
        Ok(())
    }

    fn write_header(&mut self) -> Result<()> {
        let header = format!("%PDF-{}\n", self.config.pdf_version);
        self.write_bytes(header.as_bytes())?;
        // Binary comment to ensure file is treated as binary
        self.write_bytes(&[b'%', 0xE2, 0xE3, 0xCF, 0xD3, b'\n'])?;
        Ok(())
    }

    fn write_catalog(&mut self, form_number: Option<u32>) -> Result<()> {
        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::name("Catalog"));
        catalog.set("Pages", ObjectId::new(PAGES_NUMBER, 0));
        if let Some(number) = form_number {
            catalog.set("AcroForm", ObjectId::new(number, 0));
        }
        self.write_object(CATALOG_NUMBER, &Object::Dictionary(catalog))
    }

    fn write_page_tree(&mut self, page_numbers: &[u32]) -> Result<()> {
        let kids: Vec<Object> = page_numbers
            .iter()
            .map(|&n| Object::Reference(ObjectId::new(n, 0)))
            .collect();
        let mut pages = Dictionary::new();
        pages.set("Type", Object::name("Pages"));
        pages.set("Kids", kids);
        pages.set("Count", page_numbers.len() as i64);
        self.write_object(PAGES_NUMBER, &Object::Dictionary(pages))
    }

    fn write_info(&mut self, number: u32, created: DateTime<Utc>) -> Result<()> {
        let date = Object::string(format_pdf_date(created));
        let mut info = Dictionary::new();
        info.set("Producer", Object::string(&self.config.producer));
        info.set("CreationDate", date.clone());
        info.set("ModDate", date);
        self.write_object(number, &Object::Dictionary(info))
    }

    fn write_object(&mut self, number: u32, object: &Object) -> Result<()> {
        self.xref_positions.insert(number, self.current_position);
        trace!("Writing object {} at offset {}", number, self.current_position);

        let mut record = format!("{number} 0 obj\n").into_bytes();
        match object {
            Object::Stream(stream) if self.config.compress_streams && !stream.is_encoded() => {
                let compressed = compress(stream.clone());
                record.extend(serializer::serialize(&compressed));
            }
            _ => record.extend(serializer::serialize(object)),
        }
        record.extend_from_slice(b"\nendobj\n");
        self.write_bytes(&record)
    }

    /// One subsection from 0 to `size - 1`; numbers without a record are
    /// written as free entries.
    fn xref_section(&self, size: u32) -> Vec<u8> {
        let mut out = format!("xref\n0 {size}\n").into_bytes();
        out.extend_from_slice(b"0000000000 65535 f \n");
        for number in 1..size {
            match self.xref_positions.get(&number) {
                Some(position) => {
                    out.extend(format!("{:010} {:05} n \n", position, 0).into_bytes())
                }
                None => out.extend_from_slice(b"0000000000 00000 f \n"),
            }
        }
        out
    }

    fn write_trailer(
        &mut self,
        size: u32,
        info_number: Option<u32>,
        file_id: Vec<u8>,
        xref_position: u64,
    ) -> Result<()> {
        let mut trailer = Dictionary::new();
        trailer.set("Size", i64::from(size));
        trailer.set("Root", ObjectId::new(CATALOG_NUMBER, 0));
        if let Some(number) = info_number {
            trailer.set("Info", ObjectId::new(number, 0));
        }
        let id = Object::String(PdfString::new(file_id));
        trailer.set("ID", vec![id.clone(), id]);

        let mut out = b"trailer\n".to_vec();
        out.extend(serializer::serialize(&Object::Dictionary(trailer)));
        out.extend(format!("\nstartxref\n{xref_position}\n%%EOF\n").into_bytes());
        self.write_bytes(&out)
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data).map_err(PdfError::SinkWrite)?;
        self.current_position += data.len() as u64;
        Ok(())
    }
}

impl PdfWriter<BufWriter<std::fs::File>> {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new_with_writer(BufWriter::new(file)))
    }
}

#[cfg(feature = "compression")]
fn compress(mut stream: crate::objects::Stream) -> Object {
    if let Err(e) = stream.compress_flate() {
        tracing::warn!("Stream left uncompressed: {}", e);
    }
    Object::Stream(stream)
}

#[cfg(not(feature = "compression"))]
fn compress(stream: crate::objects::Stream) -> Object {
    Object::Stream(stream)
}

/// First and second halves of the trailer `/ID` are the same for a newly
/// written file.
fn document_id(created: &DateTime<Utc>, xref: &[u8]) -> Vec<u8> {
    let mut seed = created.to_rfc3339().into_bytes();
    seed.extend_from_slice(xref);
    md5::compute(&seed).to_vec()
}

/// Format a DateTime as a PDF date string (D:YYYYMMDDHHmmSSOHH'mm)
fn format_pdf_date(date: DateTime<Utc>) -> String {
    let formatted = date.format("D:%Y%m%d%H%M%S");
    // For UTC, the offset is always +00'00
    format!("{formatted}+00'00")
}
