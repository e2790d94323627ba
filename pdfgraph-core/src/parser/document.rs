//! PDF Document - lazy, identity-preserving object graph over a reader
//!
//! [`PdfDocument`] owns a [`PdfReader`] and a cache of [`ObjectHandle`]s.
//! An object is parsed the first time a reference to it is resolved; later
//! resolutions return the same handle, so an object shared by several
//! parents (a form field referenced by many widgets) exists once in memory
//! and mutations through any path are visible through all of them.
//!
//! References inside a resolved object stay `Reference` values until they
//! are resolved in turn, which is what makes cyclic graphs safe to load.
//! A reference that names no object resolves to nothing (`Null`).
//!
//! # Example
//!
//! ```rust,no_run
//! use pdfgraph::parser::PdfDocument;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let document = PdfDocument::open("form.pdf")?;
//! let page = document.page(0)?;
//! println!("{} annotations on page 1", page.annotations(&document).len());
//!
//! if let Some(form) = document.acro_form() {
//!     for field in form.all_fields(&document) {
//!         println!("{}", field.fully_qualified_name(&document));
//!     }
//! }
//! document.save("copy.pdf")?;
//! # Ok(())
//! # }
//! ```

use super::filters::FilterRegistry;
use super::header::PdfVersion;
use super::page_tree::PageTree;
use super::reader::PdfReader;
use super::trailer::PdfTrailer;
use super::{ParseOptions, ParseResult};
use crate::error::{PdfError, Result};
use crate::forms::AcroForm;
use crate::objects::{Dictionary, Object, ObjectHandle, ObjectId, ObjectResolver, Stream};
use crate::page::Page;
use crate::writer::{PdfWriter, WriterConfig};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Identity cache of one document.
///
/// Holds the single handle per object id plus the ids already known to be
/// dangling, so neither is looked up in the file twice.
#[derive(Debug, Default)]
pub struct ObjectCache {
    handles: RefCell<HashMap<ObjectId, ObjectHandle>>,
    missing: RefCell<HashSet<ObjectId>>,
}

impl ObjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ObjectId) -> Option<ObjectHandle> {
        self.handles.borrow().get(&id).cloned()
    }

    pub fn insert(&self, handle: ObjectHandle) {
        self.missing.borrow_mut().remove(&handle.id());
        self.handles.borrow_mut().insert(handle.id(), handle);
    }

    fn remove(&self, id: ObjectId) {
        self.handles.borrow_mut().remove(&id);
    }

    pub fn mark_missing(&self, id: ObjectId) {
        self.missing.borrow_mut().insert(id);
    }

    pub fn is_missing(&self, id: ObjectId) -> bool {
        self.missing.borrow().contains(&id)
    }

    /// Number of objects loaded or created so far.
    pub fn len(&self) -> usize {
        self.handles.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.borrow().is_empty()
    }
}

/// A loaded PDF document
pub struct PdfDocument<R: Read + Seek> {
    reader: RefCell<PdfReader<R>>,
    resources: ObjectCache,
    next_number: Cell<u32>,
}

impl PdfDocument<File> {
    /// Open a file with the default (lenient) options.
    pub fn open<P: AsRef<Path>>(path: P) -> ParseResult<Self> {
        Ok(Self::new(PdfReader::open(path)?))
    }
}

impl PdfDocument<Cursor<Vec<u8>>> {
    pub fn from_bytes(data: Vec<u8>) -> ParseResult<Self> {
        Self::from_bytes_with_options(data, ParseOptions::default())
    }

    pub fn from_bytes_with_options(data: Vec<u8>, options: ParseOptions) -> ParseResult<Self> {
        Ok(Self::new(PdfReader::new_with_options(
            Cursor::new(data),
            options,
        )?))
    }
}

impl<R: Read + Seek> PdfDocument<R> {
    pub fn new(reader: PdfReader<R>) -> Self {
        let trailer_size = reader.trailer().size().unwrap_or(0);
        let next = reader
            .xref()
            .max_object_number()
            .saturating_add(1)
            .max(trailer_size)
            .max(1);
        Self {
            reader: RefCell::new(reader),
            resources: ObjectCache::new(),
            next_number: Cell::new(next),
        }
    }

    pub fn version(&self) -> PdfVersion {
        self.reader.borrow().version()
    }

    pub fn trailer(&self) -> PdfTrailer {
        self.reader.borrow().trailer().clone()
    }

    /// Whether the cross-reference index was rebuilt by scanning.
    pub fn is_recovered(&self) -> bool {
        self.reader.borrow().is_recovered()
    }

    /// Objects loaded or created so far.
    pub fn cached_objects(&self) -> usize {
        self.resources.len()
    }

    /// Resolve `id`, surfacing parse failures instead of mapping them to
    /// a dangling reference.
    pub fn try_resolve(&self, id: ObjectId) -> ParseResult<Option<ObjectHandle>> {
        if let Some(handle) = self.resources.get(id) {
            return Ok(Some(handle));
        }
        if self.resources.is_missing(id) {
            return Ok(None);
        }

        // Placeholder first: anything that asks for `id` while it is being
        // decoded gets this same handle
        let handle = ObjectHandle::new(id, Object::Null);
        self.resources.insert(handle.clone());

        let loaded = self.reader.borrow_mut().load_object(id);
        match loaded {
            Ok(Some(object)) => {
                handle.replace(object);
                Ok(Some(handle))
            }
            Ok(None) => {
                debug!("Reference {} is dangling", id);
                self.resources.remove(id);
                self.resources.mark_missing(id);
                Ok(None)
            }
            Err(e) => {
                self.resources.remove(id);
                self.resources.mark_missing(id);
                Err(e)
            }
        }
    }

    /// The document catalog.
    pub fn catalog(&self) -> Result<ObjectHandle> {
        let root = self.trailer().root()?;
        let catalog = self
            .try_resolve(root)?
            .ok_or_else(|| PdfError::InvalidStructure(format!("catalog {root} is missing")))?;
        if catalog.borrow().as_dict().is_none() {
            return Err(PdfError::InvalidStructure(format!(
                "catalog {root} is not a dictionary"
            )));
        }
        Ok(catalog)
    }

    /// The `/Info` dictionary, when present.
    pub fn info(&self) -> Option<Dictionary> {
        let id = self.trailer().info()?;
        let handle = self.resolve_handle(id)?;
        let info = handle.borrow().as_dict().cloned();
        info
    }

    fn page_tree(&self) -> Result<PageTree> {
        let catalog = self.catalog()?;
        let pages_ref = catalog
            .borrow()
            .as_dict()
            .and_then(|d| d.get("Pages"))
            .cloned();
        match pages_ref.and_then(|value| self.handle_of(&value)) {
            Some(root) => Ok(PageTree::build(self, &root)),
            None => {
                warn!("Catalog has no usable /Pages, document has no pages");
                Ok(PageTree::default())
            }
        }
    }

    pub fn page_count(&self) -> Result<usize> {
        Ok(self.page_tree()?.len())
    }

    /// Page at `index` (0-based).
    pub fn page(&self, index: usize) -> Result<Page> {
        let tree = self.page_tree()?;
        tree.get(index)
            .cloned()
            .map(Page::from_node)
            .ok_or(PdfError::InvalidPageNumber(index as u32))
    }

    /// All pages in document order.
    pub fn pages(&self) -> Result<Vec<Page>> {
        let tree = self.page_tree()?;
        Ok(tree.iter().cloned().map(Page::from_node).collect())
    }

    /// The interactive form named by the catalog. A form dictionary
    /// stored directly in the catalog is moved into its own object first.
    pub fn acro_form(&self) -> Option<AcroForm> {
        let catalog = self.catalog().ok()?;
        let mut slot = catalog.borrow().as_dict()?.get("AcroForm")?.clone();
        let handle = self.promote(&mut slot)?;
        if let Some(dict) = catalog.borrow_mut().as_dict_mut() {
            dict.set("AcroForm", slot);
        }
        if handle.borrow().as_dict().is_none() {
            warn!("/AcroForm {} is not a dictionary", handle.id());
            return None;
        }
        Some(AcroForm::from_handle(handle))
    }

    pub fn filters(&self) -> std::cell::Ref<'_, FilterRegistry> {
        std::cell::Ref::map(self.reader.borrow(), |reader| reader.filters())
    }

    /// Decoded payload of `stream` using the document's filter set.
    pub fn decode_stream(&self, stream: &Stream) -> ParseResult<Vec<u8>> {
        self.filters().decode_stream(stream)
    }

    /// Write every page, plus the form when the document has one.
    pub fn write_to<W: Write>(&self, sink: W, config: WriterConfig) -> Result<()> {
        let pages = self.pages()?;
        let form = self.acro_form();
        let mut writer = PdfWriter::with_config(sink, config);
        writer.write_pages(self, &pages, form.as_ref())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let pages = self.pages()?;
        let form = self.acro_form();
        crate::writer::write_to_file(path, self, &pages, form.as_ref(), WriterConfig::default())
    }
}

impl<R: Read + Seek> ObjectResolver for PdfDocument<R> {
    fn resolve_handle(&self, id: ObjectId) -> Option<ObjectHandle> {
        match self.try_resolve(id) {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Failed to load {}, treating as null: {}", id, e);
                None
            }
        }
    }

    fn add_object(&self, value: Object) -> ObjectHandle {
        let number = self.next_number.get();
        self.next_number.set(number + 1);
        let handle = ObjectHandle::new(ObjectId::new(number, 0), value);
        self.resources.insert(handle.clone());
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::test_helpers::{create_minimal_pdf, create_pdf_with_shared_field, PdfBuilder};

    #[test]
    fn test_resolution_is_cached_by_identity() {
        let document = PdfDocument::from_bytes(create_minimal_pdf()).unwrap();
        let first = document.resolve_handle(ObjectId::new(2, 0)).unwrap();
        let second = document.resolve_handle(ObjectId::new(2, 0)).unwrap();
        assert!(first.ptr_eq(&second));
        assert_eq!(document.cached_objects(), 1);
    }

    #[test]
    fn test_dangling_reference_is_null() {
        let document = PdfDocument::from_bytes(create_minimal_pdf()).unwrap();
        assert!(document.resolve_handle(ObjectId::new(77, 0)).is_none());
        assert_eq!(document.resolve(ObjectId::new(77, 0)), Object::Null);
        assert_eq!(document.cached_objects(), 0);
    }

    #[test]
    fn test_catalog_and_empty_pages() {
        let document = PdfDocument::from_bytes(create_minimal_pdf()).unwrap();
        assert_eq!(document.catalog().unwrap().get_type().as_deref(), Some("Catalog"));
        assert_eq!(document.page_count().unwrap(), 0);
        assert!(matches!(
            document.page(0),
            Err(PdfError::InvalidPageNumber(0))
        ));
        assert!(document.acro_form().is_none());
    }

    #[test]
    fn test_shared_parent_is_one_object() {
        let document = PdfDocument::from_bytes(create_pdf_with_shared_field(3)).unwrap();
        let a = document.resolve_handle(ObjectId::new(6, 0)).unwrap();
        let b = document.resolve_handle(ObjectId::new(7, 0)).unwrap();
        let parent_a = document.handle_of(a.borrow().as_dict().unwrap().get("Parent").unwrap());
        let parent_b = document.handle_of(b.borrow().as_dict().unwrap().get("Parent").unwrap());
        assert!(parent_a.unwrap().ptr_eq(&parent_b.unwrap()));
    }

    #[test]
    fn test_self_referencing_object_resolves() {
        let mut builder = PdfBuilder::new();
        builder.object(1, "<< /Type /Catalog /Pages 2 0 R /Me 1 0 R >>");
        builder.object(2, "<< /Type /Pages /Kids [] /Count 0 >>");
        let document = PdfDocument::from_bytes(builder.build("/Root 1 0 R")).unwrap();

        let catalog = document.catalog().unwrap();
        let me = document.handle_of(catalog.borrow().as_dict().unwrap().get("Me").unwrap());
        assert!(me.unwrap().ptr_eq(&catalog));
    }

    #[test]
    fn test_add_object_uses_fresh_numbers() {
        let document = PdfDocument::from_bytes(create_minimal_pdf()).unwrap();
        let handle = document.add_object(Object::Integer(5));
        assert_eq!(handle.id(), ObjectId::new(3, 0));
        assert!(document
            .resolve_handle(handle.id())
            .unwrap()
            .ptr_eq(&handle));
    }

    #[test]
    fn test_direct_acro_form_is_promoted() {
        let mut builder = PdfBuilder::new();
        builder.object(
            1,
            "<< /Type /Catalog /Pages 2 0 R /AcroForm << /Fields [] /NeedAppearances true >> >>",
        );
        builder.object(2, "<< /Type /Pages /Kids [] /Count 0 >>");
        let document = PdfDocument::from_bytes(builder.build("/Root 1 0 R")).unwrap();

        let form = document.acro_form().unwrap();
        let again = document.acro_form().unwrap();
        assert!(form.handle().ptr_eq(again.handle()));
        assert!(form.need_appearances());
    }
}
