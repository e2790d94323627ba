use crate::annotations::Annotation;
use crate::geometry::Rectangle;
use crate::objects::{
    array_handles, push_reference, Dictionary, Object, ObjectHandle, ObjectId, ObjectResolver,
};
use crate::parser::page_tree::{PageNode, INHERITABLE_KEYS};

/// US Letter, used when neither the page nor its ancestors give a
/// `/MediaBox`.
const DEFAULT_MEDIA_BOX: (f64, f64) = (612.0, 792.0);

/// A single page of a document.
///
/// The page wraps its `/Page` dictionary and remembers the attributes it
/// inherited from the page tree it was found in. Reading an inheritable
/// attribute consults the page's own dictionary first.
///
/// # Example
///
/// ```rust
/// use pdfgraph::annotations::{Annotation, AnnotationType};
/// use pdfgraph::geometry::Rectangle;
/// use pdfgraph::objects::ObjectArena;
/// use pdfgraph::Page;
///
/// let arena = ObjectArena::new();
/// let page = Page::new(&arena, 595.0, 842.0);
/// let note = Annotation::create(
///     &arena,
///     AnnotationType::Text,
///     Rectangle::from_position_and_size(100.0, 700.0, 20.0, 20.0),
/// );
/// page.add_annotation(&arena, &note);
///
/// assert_eq!(page.width(&arena), 595.0);
/// assert_eq!(page.annotations(&arena).len(), 1);
/// assert_eq!(note.page_ref(), Some(page.id()));
/// ```
#[derive(Debug, Clone)]
pub struct Page {
    handle: ObjectHandle,
    inherited: Dictionary,
}

impl Page {
    /// Create a page object of the given size in points.
    pub fn new(resolver: &dyn ObjectResolver, width: f64, height: f64) -> Self {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("Page"));
        dict.set(
            "MediaBox",
            Rectangle::from_position_and_size(0.0, 0.0, width, height).to_object(),
        );
        dict.set("Resources", Dictionary::new());
        Self::from_handle(resolver.add_object(Object::Dictionary(dict)))
    }

    /// Page with nothing inherited, e.g. one not reached through a tree.
    pub fn from_handle(handle: ObjectHandle) -> Self {
        Self {
            handle,
            inherited: Dictionary::new(),
        }
    }

    pub fn from_node(node: PageNode) -> Self {
        let (handle, inherited) = node.into_parts();
        Self { handle, inherited }
    }

    pub fn handle(&self) -> &ObjectHandle {
        &self.handle
    }

    pub fn id(&self) -> ObjectId {
        self.handle.id()
    }

    pub fn get(&self, key: &str) -> Option<Object> {
        self.handle.borrow().as_dict()?.get(key).cloned()
    }

    /// Own entry for `key`, or for inheritable keys the value taken from
    /// the nearest ancestor.
    pub fn get_inherited(&self, key: &str) -> Option<Object> {
        self.get(key).or_else(|| {
            INHERITABLE_KEYS
                .contains(&key)
                .then(|| self.inherited.get(key).cloned())
                .flatten()
        })
    }

    /// Inheritable attributes the page does not carry itself.
    pub fn inherited_attributes(&self) -> Dictionary {
        let value = self.handle.borrow();
        let own = value.as_dict();
        let missing: Dictionary = self
            .inherited
            .iter()
            .filter(|(key, _)| own.map_or(true, |d| !d.contains_key(key.as_str())))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        missing
    }

    pub fn media_box(&self, resolver: &dyn ObjectResolver) -> Rectangle {
        self.get_inherited("MediaBox")
            .and_then(|mb| Rectangle::from_object(&resolver.deref(&mb)))
            .unwrap_or_else(|| {
                Rectangle::from_position_and_size(0.0, 0.0, DEFAULT_MEDIA_BOX.0, DEFAULT_MEDIA_BOX.1)
            })
    }

    /// `/CropBox`, defaulting to the media box.
    pub fn crop_box(&self, resolver: &dyn ObjectResolver) -> Rectangle {
        self.get_inherited("CropBox")
            .and_then(|cb| Rectangle::from_object(&resolver.deref(&cb)))
            .unwrap_or_else(|| self.media_box(resolver))
    }

    /// Rotation in degrees, normalized to 0, 90, 180 or 270.
    pub fn rotation(&self, resolver: &dyn ObjectResolver) -> i64 {
        let rotate = self
            .get_inherited("Rotate")
            .and_then(|r| resolver.deref(&r).as_integer())
            .unwrap_or(0);
        (rotate.rem_euclid(360) / 90) * 90
    }

    pub fn resources(&self, resolver: &dyn ObjectResolver) -> Option<Dictionary> {
        let resources = self.get_inherited("Resources")?;
        resolver.deref(&resources).as_dict().cloned()
    }

    /// Width in points, accounting for rotation.
    pub fn width(&self, resolver: &dyn ObjectResolver) -> f64 {
        let mb = self.media_box(resolver);
        match self.rotation(resolver) {
            90 | 270 => mb.height(),
            _ => mb.width(),
        }
    }

    pub fn height(&self, resolver: &dyn ObjectResolver) -> f64 {
        let mb = self.media_box(resolver);
        match self.rotation(resolver) {
            90 | 270 => mb.width(),
            _ => mb.height(),
        }
    }

    /// Annotation objects in `/Annots` order. Direct annotation
    /// dictionaries become indirect objects on first access.
    pub fn annotation_handles(&self, resolver: &dyn ObjectResolver) -> Vec<ObjectHandle> {
        array_handles(resolver, &self.handle, "Annots")
    }

    pub fn annotations(&self, resolver: &dyn ObjectResolver) -> Vec<Annotation> {
        self.annotation_handles(resolver)
            .into_iter()
            .map(|handle| Annotation::from_handle(resolver, handle))
            .collect()
    }

    pub fn annotation_count(&self, resolver: &dyn ObjectResolver) -> usize {
        self.annotation_handles(resolver).len()
    }

    /// Append `annotation` to `/Annots` and point its `/P` at this page.
    pub fn add_annotation(&self, resolver: &dyn ObjectResolver, annotation: &Annotation) {
        push_reference(resolver, &self.handle, "Annots", annotation.id());
        annotation.set("P", Object::Reference(self.id()));
    }
}
