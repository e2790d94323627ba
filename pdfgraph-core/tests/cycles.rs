//! Cyclic object graphs load and write without looping

mod common;

use common::PdfBuilder;
use pdfgraph::objects::{ObjectId, ObjectResolver};
use pdfgraph::{PdfDocument, PdfWriter};

fn cyclic_field_tree() -> Vec<u8> {
    let mut builder = PdfBuilder::new();
    builder.object(1, "<< /Type /Catalog /Pages 2 0 R /AcroForm 4 0 R >>");
    builder.object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    builder.object(3, "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Annots [7 0 R] >>");
    builder.object(4, "<< /Fields [5 0 R] >>");
    // 5 -> 6 -> 5
    builder.object(5, "<< /FT /Tx /T (outer) /Kids [6 0 R] >>");
    builder.object(6, "<< /T (inner) /Parent 5 0 R /Kids [5 0 R 7 0 R] >>");
    builder.object(
        7,
        "<< /Type /Annot /Subtype /Widget /Rect [0 0 10 10] /Parent 6 0 R /P 3 0 R /Self 7 0 R >>",
    );
    builder.build("/Root 1 0 R")
}

#[test]
fn test_cyclic_field_kids_visited_once() {
    let document = PdfDocument::from_bytes(cyclic_field_tree()).unwrap();
    let fields = document.acro_form().unwrap().all_fields(&document);

    let ids: Vec<ObjectId> = fields.iter().map(|f| f.id()).collect();
    assert_eq!(ids, vec![ObjectId::new(5, 0), ObjectId::new(6, 0)]);
    assert_eq!(fields[1].fully_qualified_name(&document), "outer.inner");
}

#[test]
fn test_cyclic_graph_written_once() {
    let document = PdfDocument::from_bytes(cyclic_field_tree()).unwrap();
    let pages = document.pages().unwrap();
    let form = document.acro_form();

    let mut writer = PdfWriter::new_with_writer(Vec::new());
    writer.write_pages(&document, &pages, form.as_ref()).unwrap();
    let bytes = writer.into_inner();

    // catalog, tree, page, widget, two fields, form, info, plus entry 0
    let output = PdfDocument::from_bytes(bytes.clone()).unwrap();
    assert_eq!(output.trailer().size().unwrap(), 9);
    let records = bytes.windows(6).filter(|w| w == b" 0 obj").count();
    assert_eq!(records, 8);

    let widget = output.page(0).unwrap().annotations(&output).remove(0);
    let self_ref = widget.get("Self").and_then(|v| v.as_reference());
    assert_eq!(self_ref, Some(widget.id()));
    assert_eq!(output.acro_form().unwrap().all_fields(&output).len(), 2);
}

#[test]
fn test_self_referencing_object_resolves() {
    let mut builder = PdfBuilder::new();
    builder.object(1, "<< /Type /Catalog /Pages 2 0 R /Loop 5 0 R >>");
    builder.object(2, "<< /Type /Pages /Kids [] /Count 0 >>");
    builder.object(5, "[5 0 R 6 0 R]");
    builder.object(6, "<< /Back 5 0 R >>");
    let document = PdfDocument::from_bytes(builder.build("/Root 1 0 R")).unwrap();

    let array = document.resolve_handle(ObjectId::new(5, 0)).unwrap();
    let back = document.resolve_handle(ObjectId::new(6, 0)).unwrap();
    let target = back
        .borrow()
        .as_dict()
        .and_then(|d| d.get_reference("Back"))
        .unwrap();
    assert!(document.resolve_handle(target).unwrap().ptr_eq(&array));
}

#[test]
fn test_cyclic_page_tree_terminates() {
    let mut builder = PdfBuilder::new();
    builder.object(1, "<< /Type /Catalog /Pages 2 0 R >>");
    builder.object(2, "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >>");
    builder.object(3, "<< /Type /Pages /Kids [2 0 R 5 0 R] /Parent 2 0 R >>");
    builder.object(4, "<< /Type /Page /Parent 2 0 R >>");
    builder.object(5, "<< /Type /Page /Parent 3 0 R >>");
    let document = PdfDocument::from_bytes(builder.build("/Root 1 0 R")).unwrap();

    let ids: Vec<ObjectId> = document.pages().unwrap().iter().map(|p| p.id()).collect();
    assert_eq!(ids, vec![ObjectId::new(5, 0), ObjectId::new(4, 0)]);
}
