//! Builders for hand-assembled test PDFs with correct xref offsets

use std::collections::{BTreeMap, HashMap};

/// Appends objects to an in-memory PDF and writes matching xref sections.
/// Every call to [`PdfBuilder::finish_section`] produces an incremental
/// section whose `/Prev` points at the previous one.
pub struct PdfBuilder {
    buf: Vec<u8>,
    offsets: HashMap<u32, u64>,
    compressed: BTreeMap<u32, (u32, u32)>,
    pending: BTreeMap<u32, u64>,
    prev_xref: Option<usize>,
    max_number: u32,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self::with_version("1.7")
    }

    pub fn with_version(version: &str) -> Self {
        let mut buf = format!("%PDF-{version}\n").into_bytes();
        buf.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");
        Self {
            buf,
            offsets: HashMap::new(),
            compressed: BTreeMap::new(),
            pending: BTreeMap::new(),
            prev_xref: None,
            max_number: 0,
        }
    }

    fn record(&mut self, number: u32) {
        let offset = self.buf.len() as u64;
        self.offsets.insert(number, offset);
        self.pending.insert(number, offset);
        self.compressed.remove(&number);
        self.max_number = self.max_number.max(number);
    }

    /// `number 0 obj <body> endobj`
    pub fn object(&mut self, number: u32, body: &str) -> &mut Self {
        self.record(number);
        self.buf
            .extend_from_slice(format!("{number} 0 obj\n{body}\nendobj\n").as_bytes());
        self
    }

    /// Stream object with a direct `/Length`; `dict_entries` goes inside
    /// the dictionary.
    pub fn stream_object(&mut self, number: u32, dict_entries: &str, data: &[u8]) -> &mut Self {
        self.record(number);
        self.buf.extend_from_slice(
            format!(
                "{number} 0 obj\n<< {dict_entries} /Length {} >>\nstream\n",
                data.len()
            )
            .as_bytes(),
        );
        self.buf.extend_from_slice(data);
        self.buf.extend_from_slice(b"\nendstream\nendobj\n");
        self
    }

    /// Uncompressed object stream holding `objects`. Only usable together
    /// with [`PdfBuilder::build_with_xref_stream`].
    pub fn object_stream(&mut self, number: u32, objects: &[(u32, &str)]) -> &mut Self {
        let mut header = String::new();
        let mut body = String::new();
        for (number, text) in objects {
            header.push_str(&format!("{} {} ", number, body.len()));
            body.push_str(text);
            body.push(' ');
        }
        let first = header.len();
        let data = format!("{header}{body}");
        self.stream_object(
            number,
            &format!("/Type /ObjStm /N {} /First {first}", objects.len()),
            data.as_bytes(),
        );
        for (slot, (member, _)) in objects.iter().enumerate() {
            self.compressed.insert(*member, (number, slot as u32));
            self.max_number = self.max_number.max(*member);
        }
        self
    }

    /// Raw bytes, e.g. to corrupt a file on purpose.
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Write an xref table for the objects added since the last section,
    /// then the trailer and `startxref`.
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

    /// Like [`PdfBuilder::build`], also returning every object's offset.
    pub fn build_with_offsets(mut self, trailer_entries: &str) -> (Vec<u8>, HashMap<u32, u64>) {
        self.finish_section(trailer_entries);
        (self.buf, self.offsets)
    }

    /// Finish with a single cross-reference stream covering every object,
    /// including those inside object streams.
    pub fn build_with_xref_stream(
        mut self,
        trailer_entries: &str,
    ) -> (Vec<u8>, HashMap<u32, u64>) {
        let xref_number = self.max_number + 1;
        let xref_at = self.buf.len() as u64;
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

        let prev = self
            .prev_xref
            .map(|p| format!(" /Prev {p}"))
            .unwrap_or_default();
        self.buf.extend_from_slice(
            format!(
                "{xref_number} 0 obj\n<< /Type /XRef /Size {} /W [1 4 2]{prev} {trailer_entries} /Length {} >>\nstream\n",
                xref_number + 1,
                rows.len()
            )
            .as_bytes(),
        );
        self.buf.extend_from_slice(&rows);
        self.buf.extend_from_slice(
            format!("\nendstream\nendobj\nstartxref\n{xref_at}\n%%EOF\n").as_bytes(),
        );
        (self.buf, self.offsets)
    }
}

/// Catalog + empty page tree, the smallest loadable document.
pub fn create_minimal_pdf() -> Vec<u8> {
    let mut builder = PdfBuilder::with_version("1.4");
    builder.object(1, "<< /Type /Catalog /Pages 2 0 R >>");
    builder.object(2, "<< /Type /Pages /Kids [] /Count 0 >>");
    builder.build("/Root 1 0 R")
}

/// One page with `annotation_count` Widget annotations whose shared parent
/// field is object 5.
pub fn create_pdf_with_shared_field(annotation_count: u32) -> Vec<u8> {
    let first_annot = 6;
    let annots: Vec<String> = (0..annotation_count)
        .map(|i| format!("{} 0 R", first_annot + i))
        .collect();
    let annots = annots.join(" ");

    let mut builder = PdfBuilder::new();
    builder.object(1, "<< /Type /Catalog /Pages 2 0 R /AcroForm 4 0 R >>");
    builder.object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    builder.object(
        3,
        &format!("<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Annots [{annots}] >>"),
    );
    builder.object(4, "<< /Fields [5 0 R] >>");
    builder.object(
        5,
        &format!("<< /FT /Btn /Ff 32768 /T (choice) /Kids [{annots}] >>"),
    );
    for i in 0..annotation_count {
        builder.object(
            first_annot + i,
            &format!(
                "<< /Type /Annot /Subtype /Widget /Rect [{0} 0 {1} 10] /Parent 5 0 R /P 3 0 R >>",
                i * 20,
                i * 20 + 10
            ),
        );
    }
    builder.build("/Root 1 0 R")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_pdf_structure() {
        let pdf = create_minimal_pdf();
        assert!(pdf.starts_with(b"%PDF-1.4\n"));
        assert!(pdf.ends_with(b"%%EOF\n"));
    }

    #[test]
    fn test_offsets_point_at_objects() {
        let mut builder = PdfBuilder::new();
        builder.object(7, "(x)");
        let (pdf, offsets) = builder.build_with_offsets("/Root 7 0 R");
        let at = offsets[&7] as usize;
        assert!(pdf[at..].starts_with(b"7 0 obj"));
    }
}
