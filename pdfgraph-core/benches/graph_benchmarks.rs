//! Object graph benchmarks
//!
//! Measures loading a form-heavy document (every page, annotation and
//! field resolved) and writing it back out.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pdfgraph::annotations::{Annotation, AnnotationType};
use pdfgraph::forms::{AcroForm, Field, FieldType};
use pdfgraph::geometry::Rectangle;
use pdfgraph::objects::ObjectArena;
use pdfgraph::{Page, PdfDocument, PdfWriter};

/// `pages` pages, each with `widgets_per_page` text fields.
fn form_pdf(pages: usize, widgets_per_page: usize) -> Vec<u8> {
    let arena = ObjectArena::new();
    let form = AcroForm::new(&arena);
    let mut all_pages = Vec::with_capacity(pages);

    for p in 0..pages {
        let page = Page::new(&arena, 612.0, 792.0);
        for w in 0..widgets_per_page {
            let field = Field::create(&arena, &format!("p{p}_f{w}"), FieldType::Text);
            form.add_field(&arena, &field);
            let rect = Rectangle::from_position_and_size(50.0, 750.0 - 30.0 * w as f64, 200.0, 20.0);
            let mut widget = Annotation::create(&arena, AnnotationType::Widget, rect);
            if let Some(widget) = widget.as_widget_mut() {
                widget.set_parent(&field);
            }
            page.add_annotation(&arena, &widget);
        }
        all_pages.push(page);
    }

    let mut writer = PdfWriter::new_with_writer(Vec::new());
    writer
        .write_pages(&arena, &all_pages, Some(&form))
        .unwrap();
    writer.into_inner()
}

fn bench_load_and_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("load_and_resolve");

    for pages in [1, 10, 50] {
        let bytes = form_pdf(pages, 20);
        group.bench_with_input(BenchmarkId::from_parameter(pages), &bytes, |b, bytes| {
            b.iter(|| {
                let document = PdfDocument::from_bytes(bytes.clone()).unwrap();
                let mut widgets = 0;
                for page in document.pages().unwrap() {
                    widgets += page
                        .annotations(&document)
                        .iter()
                        .filter(|a| a.as_widget().and_then(|w| w.field()).is_some())
                        .count();
                }
                let fields = document.acro_form().unwrap().all_fields(&document).len();
                black_box((widgets, fields))
            });
        });
    }

    group.finish();
}

fn bench_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("write");

    for pages in [1, 10, 50] {
        let document = PdfDocument::from_bytes(form_pdf(pages, 20)).unwrap();
        let all_pages = document.pages().unwrap();
        let form = document.acro_form();

        group.bench_function(BenchmarkId::new("with_form", pages), |b| {
            b.iter(|| {
                let mut writer = PdfWriter::new_with_writer(Vec::new());
                writer
                    .write_pages(&document, &all_pages, form.as_ref())
                    .unwrap();
                black_box(writer.bytes_written())
            });
        });

        group.bench_function(BenchmarkId::new("pages_only", pages), |b| {
            b.iter(|| {
                let mut writer = PdfWriter::new_with_writer(Vec::new());
                writer.write_pages(&document, &all_pages, None).unwrap();
                black_box(writer.bytes_written())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_load_and_resolve, bench_write);
criterion_main!(benches);
