//! # pdfgraph
//!
//! A PDF object-graph engine: load a document lazily through its
//! cross-reference index, work with pages, annotations and form fields as
//! typed views over shared objects, and write any set of pages back out as
//! a fresh, self-consistent file.
//!
//! ## Features
//!
//! - **Cross-reference index**: classic tables, xref streams, hybrid files
//!   and `/Prev` chains, with a recovery scan for broken files
//! - **Lazy resolution**: objects are parsed on first use and cached, so
//!   every reference to the same object yields the same in-memory instance
//! - **Object streams**: compressed objects are loaded from their
//!   containers, each container parsed once
//! - **Entities**: pages with inherited attributes, annotations dispatched
//!   on `/Subtype`, AcroForm fields with their widgets
//! - **Writer**: renumbers the reachable graph, writes every object once
//!   and emits a single xref table and trailer; cycles are safe
//!
//! ## Quick Start
//!
//! ### Reading and rewriting a document
//!
//! ```rust,no_run
//! use pdfgraph::parser::PdfDocument;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let document = PdfDocument::open("form.pdf")?;
//! println!("PDF {} with {} pages", document.version(), document.page_count()?);
//!
//! for page in document.pages()? {
//!     for annotation in page.annotations(&document) {
//!         if let Some(widget) = annotation.as_widget() {
//!             if let Some(field) = widget.field() {
//!                 println!("widget of {}", field.fully_qualified_name(&document));
//!             }
//!         }
//!     }
//! }
//!
//! document.save("copy.pdf")?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Building a document from scratch
//!
//! ```rust
//! use pdfgraph::annotations::{Annotation, AnnotationType};
//! use pdfgraph::forms::{AcroForm, Field, FieldType};
//! use pdfgraph::geometry::Rectangle;
//! use pdfgraph::objects::ObjectArena;
//! use pdfgraph::writer::PdfWriter;
//! use pdfgraph::Page;
//!
//! # fn main() -> pdfgraph::Result<()> {
//! let arena = ObjectArena::new();
//! let page = Page::new(&arena, 612.0, 792.0);
//! let form = AcroForm::new(&arena);
//!
//! let field = Field::create(&arena, "name", FieldType::Text);
//! form.add_field(&arena, &field);
//! let rect = Rectangle::from_position_and_size(50.0, 700.0, 200.0, 20.0);
//! let mut widget = Annotation::create(&arena, AnnotationType::Widget, rect);
//! if let Some(w) = widget.as_widget_mut() {
//!     w.set_parent(&field);
//! }
//! page.add_annotation(&arena, &widget);
//!
//! let mut writer = PdfWriter::new_with_writer(Vec::new());
//! writer.write_pages(&arena, &[page], Some(&form))?;
//! assert!(writer.into_inner().starts_with(b"%PDF-1.7"));
//! # Ok(())
//! # }
//! ```

pub mod annotations;
pub mod error;
pub mod forms;
pub mod geometry;
pub mod objects;
pub mod page;
pub mod parser;
pub mod recovery;
pub mod writer;

pub use annotations::{Annotation, AnnotationType};
pub use error::{PdfError, Result};
pub use forms::{AcroForm, Field};
pub use objects::{Dictionary, Object, ObjectArena, ObjectHandle, ObjectId, ObjectResolver};
pub use page::Page;
pub use parser::{ParseError, ParseOptions, PdfDocument, PdfReader};
pub use writer::{PdfWriter, WriterConfig};

/// Current version of pdfgraph
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
