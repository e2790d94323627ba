//! Writing to files and to sinks that fail part way

mod common;

use common::form_document;
use pdfgraph::writer::write_to_file;
use pdfgraph::{PdfDocument, PdfError, PdfWriter, WriterConfig};
use std::io::{self, ErrorKind, Write};
use tempfile::TempDir;

/// Accepts `limit` bytes, then fails every write with `kind`.
struct LimitedSink {
    written: Vec<u8>,
    limit: usize,
    kind: ErrorKind,
}

impl Write for LimitedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let room = self.limit.saturating_sub(self.written.len());
        if room == 0 {
            return Err(io::Error::new(self.kind, "sink full"));
        }
        let n = room.min(buf.len());
        self.written.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_failing_sink_reports_its_error() {
    let document = PdfDocument::from_bytes(form_document()).unwrap();
    let mut full = Vec::new();
    document.write_to(&mut full, WriterConfig::default()).unwrap();

    for limit in [0, 1, 20, 500, full.len() / 2, full.len() - 1] {
        let sink = LimitedSink {
            written: Vec::new(),
            limit,
            kind: ErrorKind::StorageFull,
        };
        let err = document
            .write_to(sink, WriterConfig::default())
            .expect_err("write past the limit must fail");
        assert!(matches!(err, PdfError::SinkWrite(_)), "limit {limit}: {err}");
        assert_eq!(err.sink_error().map(io::Error::kind), Some(ErrorKind::StorageFull));
    }
}

#[test]
fn test_sink_error_kind_is_preserved() {
    let document = PdfDocument::from_bytes(form_document()).unwrap();
    let sink = LimitedSink {
        written: Vec::new(),
        limit: 100,
        kind: ErrorKind::BrokenPipe,
    };
    let err = document.write_to(sink, WriterConfig::default()).unwrap_err();
    assert_eq!(err.sink_error().unwrap().kind(), ErrorKind::BrokenPipe);
}

#[test]
fn test_save_and_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("form.pdf");

    let document = PdfDocument::from_bytes(form_document()).unwrap();
    document.save(&path).unwrap();

    let reopened = PdfDocument::open(&path).unwrap();
    assert_eq!(reopened.page_count().unwrap(), 1);
    assert_eq!(reopened.acro_form().unwrap().all_fields(&reopened).len(), 17);
    let info = reopened.info().unwrap();
    assert!(info.contains_key("Producer"));
    assert!(info.contains_key("CreationDate"));
}

#[test]
fn test_write_selected_pages_to_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pages.pdf");

    let document = PdfDocument::from_bytes(form_document()).unwrap();
    let pages = document.pages().unwrap();
    write_to_file(&path, &document, &pages, None, WriterConfig::default()).unwrap();

    let reopened = PdfDocument::open(&path).unwrap();
    assert!(reopened.acro_form().is_none());
    assert_eq!(reopened.page(0).unwrap().annotation_count(&reopened), 17);
}

#[test]
fn test_writer_new_creates_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("blank.pdf");

    let document = PdfDocument::from_bytes(form_document()).unwrap();
    let pages = document.pages().unwrap();
    let mut writer = PdfWriter::new(&path).unwrap();
    writer.write_pages(&document, &pages, None).unwrap();
    drop(writer);

    let bytes = std::fs::read(&path).unwrap();
    assert!(bytes.starts_with(b"%PDF-1.7"));
    assert!(bytes.ends_with(b"%%EOF\n"));
}
