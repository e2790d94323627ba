//! Hand-assembled PDFs shared by the integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;

/// Appends objects to an in-memory PDF and writes matching xref sections.
/// Each [`PdfBuilder::finish_section`] starts an incremental update whose
/// `/Prev` points at the section before it.
pub struct PdfBuilder {
    buf: Vec<u8>,
    pending: BTreeMap<u32, usize>,
    compressed: BTreeMap<u32, (u32, u32)>,
    offsets: BTreeMap<u32, usize>,
    prev_xref: Option<usize>,
    max_number: u32,
}

impl PdfBuilder {
    pub fn new() -> Self {
        let mut buf = b"%PDF-1.7\n".to_vec();
        buf.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");
        Self {
            buf,
            pending: BTreeMap::new(),
            compressed: BTreeMap::new(),
            offsets: BTreeMap::new(),
            prev_xref: None,
            max_number: 0,
        }
    }

    pub fn object(&mut self, number: u32, body: &str) -> &mut Self {
        self.pending.insert(number, self.buf.len());
        self.offsets.insert(number, self.buf.len());
        self.compressed.remove(&number);
        self.max_number = self.max_number.max(number);
        self.buf
            .extend_from_slice(format!("{number} 0 obj\n{body}\nendobj\n").as_bytes());
        self
    }

    /// Uncompressed `/ObjStm` holding `objects`; pair with
    /// [`PdfBuilder::build_with_xref_stream`].
    pub fn object_stream(&mut self, number: u32, objects: &[(u32, &str)]) -> &mut Self {
        let mut header = String::new();
        let mut body = String::new();
        for (member, text) in objects {
            header.push_str(&format!("{member} {} ", body.len()));
            body.push_str(text);
            body.push(' ');
        }
        let data = format!("{header}{body}");
        self.object(
            number,
            &format!(
                "<< /Type /ObjStm /N {} /First {} /Length {} >>\nstream\n{data}\nendstream",
                objects.len(),
                header.len(),
                data.len()
            ),
        );
        for (slot, (member, _)) in objects.iter().enumerate() {
            self.compressed.insert(*member, (number, slot as u32));
            self.max_number = self.max_number.max(*member);
        }
        self
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn finish_section(&mut self, trailer_entries: &str) -> &mut Self {
        let xref_at = self.buf.len();
        let mut xref = String::from("xref\n");
        if self.prev_xref.is_none() {
            xref.push_str("0 1\n0000000000 65535 f \n");
        }
        for (number, offset) in std::mem::take(&mut self.pending) {
            xref.push_str(&format!("{number} 1\n{offset:010} 00000 n \n"));
        }
        let prev = self
            .prev_xref
            .map(|p| format!(" /Prev {p}"))
            .unwrap_or_default();
        xref.push_str(&format!(
            "trailer\n<< /Size {}{prev} {trailer_entries} >>\nstartxref\n{xref_at}\n%%EOF\n",
            self.max_number + 1
        ));
        self.buf.extend_from_slice(xref.as_bytes());
        self.prev_xref = Some(xref_at);
        self
    }

    pub fn build(mut self, trailer_entries: &str) -> Vec<u8> {
        self.finish_section(trailer_entries);
        self.buf
    }

    /// Finish with one cross-reference stream covering every object.
    pub fn build_with_xref_stream(mut self, trailer_entries: &str) -> Vec<u8> {
        let xref_number = self.max_number + 1;
        let xref_at = self.buf.len();
        self.offsets.insert(xref_number, xref_at);

        let mut rows = Vec::new();
        for number in 0..=xref_number {
            let (kind, field2, field3) = if number == 0 {
                (0u8, 0u32, 65535u16)
            } else if let Some(&(stream, slot)) = self.compressed.get(&number) {
                (2, stream, slot as u16)
            } else if let Some(&offset) = self.offsets.get(&number) {
                (1, offset as u32, 0)
            } else {
                (0, 0, 0)
            };
            rows.push(kind);
            rows.extend_from_slice(&field2.to_be_bytes());
            rows.extend_from_slice(&field3.to_be_bytes());
        }

        self.buf.extend_from_slice(
            format!(
                "{xref_number} 0 obj\n<< /Type /XRef /Size {} /W [1 4 2] {trailer_entries} /Length {} >>\nstream\n",
                xref_number + 1,
                rows.len()
            )
            .as_bytes(),
        );
        self.buf.extend_from_slice(&rows);
        self.buf.extend_from_slice(
            format!("\nendstream\nendobj\nstartxref\n{xref_at}\n%%EOF\n").as_bytes(),
        );
        self.buf
    }
}

/// Number of text fields in [`form_document`], each with one widget.
pub const TEXT_FIELDS: u32 = 13;

/// A single page carrying 17 widgets over 17 fields:
///
/// - text fields `text0`..`text12` (objects 10, 12, ..., 34), each with a
///   separate widget kid at the following number
/// - `address` (40) whose kids `street` (41) and `city` (42) are merged
///   field/widget dictionaries
/// - radio group `choice` (50) with widgets 51 and 52
pub fn form_document() -> Vec<u8> {
    let mut builder = PdfBuilder::new();
    let mut annots = Vec::new();
    let mut fields = Vec::new();

    builder.object(1, "<< /Type /Catalog /Pages 2 0 R /AcroForm 4 0 R >>");
    builder.object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 /MediaBox [0 0 612 792] >>");

    for i in 0..TEXT_FIELDS {
        let field = 10 + 2 * i;
        let widget = field + 1;
        let y = 700 - 40 * i as i32;
        builder.object(
            field,
            &format!("<< /FT /Tx /T (text{i}) /V (value {i}) /Kids [{widget} 0 R] >>"),
        );
        builder.object(
            widget,
            &format!(
                "<< /Type /Annot /Subtype /Widget /Rect [50 {y} 250 {}] /Parent {field} 0 R /P 3 0 R >>",
                y + 20
            ),
        );
        fields.push(format!("{field} 0 R"));
        annots.push(format!("{widget} 0 R"));
    }

    builder.object(40, "<< /FT /Tx /T (address) /Kids [41 0 R 42 0 R] >>");
    builder.object(
        41,
        "<< /Type /Annot /Subtype /Widget /T (street) /Parent 40 0 R /Rect [300 700 500 720] /P 3 0 R >>",
    );
    builder.object(
        42,
        "<< /Type /Annot /Subtype /Widget /T (city) /Parent 40 0 R /Rect [300 660 500 680] /P 3 0 R >>",
    );
    fields.push("40 0 R".to_string());
    annots.push("41 0 R 42 0 R".to_string());

    builder.object(50, "<< /FT /Btn /Ff 49152 /T (choice) /V /Off /Kids [51 0 R 52 0 R] >>");
    for (number, x) in [(51, 300), (52, 340)] {
        builder.object(
            number,
            &format!(
                "<< /Type /Annot /Subtype /Widget /Rect [{x} 600 {} 620] /Parent 50 0 R /P 3 0 R /AS /Off >>",
                x + 20
            ),
        );
    }
    fields.push("50 0 R".to_string());
    annots.push("51 0 R 52 0 R".to_string());

    builder.object(
        3,
        &format!(
            "<< /Type /Page /Parent 2 0 R /Resources << >> /Annots [{}] >>",
            annots.join(" ")
        ),
    );
    builder.object(
        4,
        &format!(
            "<< /Fields [{}] /NeedAppearances true /DA (/Helv 0 Tf 0 g) >>",
            fields.join(" ")
        ),
    );
    builder.build("/Root 1 0 R")
}

/// One page with `count` widgets sharing the parent field 5.
pub fn shared_field_document(count: u32) -> Vec<u8> {
    let annots: Vec<String> = (0..count).map(|i| format!("{} 0 R", 6 + i)).collect();
    let annots = annots.join(" ");

    let mut builder = PdfBuilder::new();
    builder.object(1, "<< /Type /Catalog /Pages 2 0 R /AcroForm 4 0 R >>");
    builder.object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    builder.object(
        3,
        &format!("<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Annots [{annots}] >>"),
    );
    builder.object(4, "<< /Fields [5 0 R] >>");
    builder.object(5, &format!("<< /FT /Btn /Ff 32768 /T (group) /Kids [{annots}] >>"));
    for i in 0..count {
        builder.object(
            6 + i,
            &format!(
                "<< /Type /Annot /Subtype /Widget /Rect [{} 0 {} 10] /Parent 5 0 R /P 3 0 R >>",
                i * 20,
                i * 20 + 10
            ),
        );
    }
    builder.build("/Root 1 0 R")
}
